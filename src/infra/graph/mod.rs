// Microsoft Graph workbook API.

#[path = "graph_workbook_client.rs"]
pub mod graph_workbook_client;

pub use graph_workbook_client::GraphWorkbookClient;

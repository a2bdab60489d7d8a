// Runs a parsed command against a wired-up `SourceService` and writes the
// resulting protocol messages.

use std::io::Write;

use anyhow::Context;

use crate::core::config::ConfigError;
use crate::core::source::{ConnectionStatus, SourceError, SourceService};
use crate::core::workbook::WorkbookApi;

use super::messages::{Message, MessageWriter};

pub async fn check<A: WorkbookApi, W: Write>(
    service: &SourceService<A>,
    out: &mut MessageWriter<W>,
) -> anyhow::Result<()> {
    let status = service.check_connection().await;
    match &status.reason {
        Some(reason) => tracing::warn!("Connection check failed: {}", reason),
        None => tracing::info!("Connection check succeeded"),
    }

    out.write(&Message::connection_status(&status))
        .context("Failed to write connection status")
}

/// A config that cannot be loaded still gets a connection status, not a crash.
pub fn check_invalid_config<W: Write>(
    error: &ConfigError,
    out: &mut MessageWriter<W>,
) -> anyhow::Result<()> {
    let status = ConnectionStatus {
        connected: false,
        reason: Some(error.to_string()),
    };
    out.write(&Message::connection_status(&status))
        .context("Failed to write connection status")
}

pub async fn discover<A: WorkbookApi, W: Write>(
    service: &SourceService<A>,
    out: &mut MessageWriter<W>,
) -> anyhow::Result<()> {
    let streams = match service.discover().await {
        Ok(streams) => streams,
        Err(e) => return fail(e, out),
    };

    out.write(&Message::catalog(streams))
        .context("Failed to write catalog")
}

pub async fn read<A: WorkbookApi, W: Write>(
    service: &SourceService<A>,
    out: &mut MessageWriter<W>,
) -> anyhow::Result<()> {
    let reports = match service.read(out).await {
        Ok(reports) => reports,
        // The output itself is gone, so there is nowhere to report to.
        Err(e @ SourceError::Output(_)) => {
            return Err(anyhow::Error::new(e).context("Failed to write records"))
        }
        Err(e) => return fail(e, out),
    };

    let records: u64 = reports.iter().map(|r| r.records).sum();
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    tracing::info!(
        streams = reports.len(),
        records,
        failed,
        "Read finished"
    );
    Ok(())
}

fn fail<W: Write>(error: SourceError, out: &mut MessageWriter<W>) -> anyhow::Result<()> {
    tracing::error!(error = %error, "Command failed");
    out.write(&Message::config_error(error.to_string(), error.internal_message()))
        .context("Failed to write error trace")?;
    Err(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Credentials, SourceConfig};
    use crate::core::workbook::mock_workbook::MockWorkbook;
    use serde_json::{json, Value};

    fn config() -> SourceConfig {
        SourceConfig {
            workbook_path: "/Orders.xlsx".to_string(),
            credentials: Credentials::ServiceKey {
                tenant_id: "contoso".to_string(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            batch_size: 10,
            names_conversion: true,
            parse_dates: true,
            stream_name_overrides: None,
        }
    }

    fn workbook() -> MockWorkbook {
        MockWorkbook::new().with_sheet(
            "s1",
            "Orders",
            vec![
                vec![json!("Customer Name"), json!("Created Date")],
                vec![json!("Bob"), json!(45000)],
            ],
        )
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn output(writer: MessageWriter<Vec<u8>>) -> Vec<Value> {
        String::from_utf8(writer.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_check_writes_status() {
        let service = SourceService::new(workbook(), config());
        let mut out = MessageWriter::new(Vec::new());

        check(&service, &mut out).await.unwrap();

        let messages = output(out);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["connectionStatus"]["status"], json!("SUCCEEDED"));
    }

    #[test]
    fn test_invalid_config_is_failed_status() {
        let mut out = MessageWriter::new(Vec::new());
        let err = ConfigError::Invalid("batch_size must be at least 1".to_string());

        check_invalid_config(&err, &mut out).unwrap();

        let messages = output(out);
        assert_eq!(messages[0]["connectionStatus"]["status"], json!("FAILED"));
        assert!(messages[0]["connectionStatus"]["message"]
            .as_str()
            .unwrap()
            .contains("batch_size"));
    }

    #[tokio::test]
    async fn test_discover_writes_catalog() {
        let service = SourceService::new(workbook(), config());
        let mut out = MessageWriter::new(Vec::new());

        discover(&service, &mut out).await.unwrap();

        let messages = output(out);
        let stream = &messages[0]["catalog"]["streams"][0];
        assert_eq!(stream["name"], json!("Orders"));
        assert!(stream["json_schema"]["properties"]
            .as_object()
            .unwrap()
            .contains_key("customer_name"));
    }

    #[tokio::test]
    async fn test_discover_failure_writes_trace() {
        let mut api = workbook();
        api.fail_listing = true;
        let service = SourceService::new(api, config());
        let mut out = MessageWriter::new(Vec::new());

        assert!(discover(&service, &mut out).await.is_err());

        let messages = output(out);
        assert_eq!(messages[0]["type"], json!("TRACE"));
        assert_eq!(messages[0]["trace"]["error"]["failure_type"], json!("config_error"));
    }

    #[tokio::test]
    async fn test_read_writes_records() {
        let service = SourceService::new(workbook(), config());
        let mut out = MessageWriter::new(Vec::new());

        read(&service, &mut out).await.unwrap();

        let messages = output(out);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["record"]["stream"], json!("Orders"));
        assert_eq!(
            messages[0]["record"]["data"],
            json!({ "customer_name": "Bob", "created_date": "2023-03-14" })
        );
    }

    #[tokio::test]
    async fn test_read_fails_when_output_is_closed() {
        let service = SourceService::new(workbook(), config());
        let mut out = MessageWriter::new(BrokenPipe);

        let err = read(&service, &mut out).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to write records");
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::Output(_))
        ));
    }
}

// Microsoft identity platform token exchange.

#[path = "microsoft_token_provider.rs"]
pub mod microsoft_token_provider;

pub use microsoft_token_provider::MicrosoftTokenProvider;

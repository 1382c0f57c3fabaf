use magpie::providers::configs::OpenAiProviderConfig;

use crate::configuration::Settings;

/// How chat requests are served, decided once at startup
#[derive(Clone)]
pub enum Dispatch {
    /// A completion credential is configured, requests run through the full agent
    Augmented(OpenAiProviderConfig),
    /// No credential, requests get rule-based offline replies
    Fallback,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatch: Dispatch,
}

impl AppState {
    pub fn new(settings: &Settings, api_key: Option<String>) -> Self {
        let dispatch = match api_key {
            Some(api_key) => Dispatch::Augmented(OpenAiProviderConfig {
                host: settings.provider.host.clone(),
                api_key,
                model: settings.provider.model.clone(),
                temperature: settings.provider.temperature,
                max_tokens: settings.provider.max_tokens,
            }),
            None => Dispatch::Fallback,
        };

        Self { dispatch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_switches_to_augmented() {
        let settings = Settings::default();
        let state = AppState::new(&settings, Some("sk-test".to_string()));

        match state.dispatch {
            Dispatch::Augmented(config) => {
                assert_eq!(config.api_key, "sk-test");
                assert_eq!(config.host, "https://api.openai.com");
                assert_eq!(config.model, "gpt-4o-mini");
            }
            Dispatch::Fallback => panic!("expected augmented dispatch"),
        }
    }

    #[test]
    fn test_missing_credential_falls_back() {
        let settings = Settings::default();
        let state = AppState::new(&settings, None);

        assert!(matches!(state.dispatch, Dispatch::Fallback));
    }
}

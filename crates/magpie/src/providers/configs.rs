// Connection settings for an OpenAI compatible completion endpoint.
// The model and sampling parameters ride along so callers configure a
// provider once instead of threading them through every request.
#[derive(Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

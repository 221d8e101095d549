use crate::{
    error::Result,
    models::{GenerateContentRequest, GenerateContentResponse},
};
use async_trait::async_trait;

/// The remote model boundary. Both the idea and the image requests go
/// through this single operation; only the model and payload differ.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;

    fn name(&self) -> &str {
        "backend"
    }
}

use async_trait::async_trait;

use crate::classify::prompts::ClassificationRequest;
use crate::error::Result;
use crate::taxonomy::CategorySet;

/// The narrow seam around the external classification service: observation
/// text in, validated taxonomy members out. The retry and sentinel logic in
/// the runner is written against this trait so tests can substitute a
/// scripted stub for the live service.
#[async_trait]
pub trait ClassifierProvider: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<CategorySet>;
    fn name(&self) -> &str;
}

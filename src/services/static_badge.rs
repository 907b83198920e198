use async_trait::async_trait;

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use crate::badge::Badge;
use crate::config::defaults::DEFAULT_BADGE_COLOR;
use crate::errors::{HandlerError, HandlerResult};

/// Badge content taken verbatim from the path: `/static/<title>/<text>[/<color>]`
pub struct StaticHandler;

#[async_trait]
impl ServiceHandler for StaticHandler {
    fn documentation(&self) -> Vec<ServiceDocumentation> {
        vec![ServiceDocumentation::new(
            "Static badge",
            "/static/API/Documentation/4c1",
            &["<title>", "<text>", "[color]"],
        )]
    }

    async fn handle(&self, _ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge> {
        let [title, text, rest @ ..] = params else {
            return Err(HandlerError::invalid_parameters(
                "You need to provide title and text",
            ));
        };

        let color = rest
            .first()
            .map(String::as_str)
            .filter(|color| !color.is_empty())
            .unwrap_or(DEFAULT_BADGE_COLOR);

        Ok(Badge::new(title.as_str(), text.as_str(), color))
    }
}

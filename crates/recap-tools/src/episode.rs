//! Summarize one episode's plot via scrape + LLM call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use recap_core::{
    CompletionRequest, Error, Message, PropertySchema, Provider, Tool, ToolDefinition, ToolOutput,
    ToolParameters,
};
use recap_scrape::{EpisodeScraper, Scraped};

const SYSTEM_PROMPT: &str = "You summarize television episode plots. Given the full plot summary \
of an episode, reply with a concise prose summary of two or three paragraphs. Stick to events \
that appear in the text; do not invent details.";

const SUMMARY_MAX_TOKENS: u32 = 1024;

pub struct SummarizeEpisodeTool {
    scraper: EpisodeScraper,
    provider: Arc<dyn Provider>,
    model: Option<String>,
}

impl SummarizeEpisodeTool {
    pub fn new(scraper: EpisodeScraper, provider: Arc<dyn Provider>) -> Self {
        Self {
            scraper,
            provider,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    async fn summarize(&self, episode: &str) -> Result<Option<String>, Error> {
        let text = match self.scraper.fetch_plot(episode).await? {
            Scraped::NotFound => return Ok(None),
            Scraped::Found(text) => text,
        };

        info!(episode, chars = text.len(), "summarizing extracted plot");
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("Episode: {episode}\n\nPlot summary:\n{text}")),
        ];
        let mut request = CompletionRequest::new(messages).with_max_tokens(SUMMARY_MAX_TOKENS);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        let response = self.provider.complete(request).await?;
        Ok(Some(response.message.content))
    }
}

#[derive(Deserialize)]
struct SummarizeArgs {
    episode: String,
}

#[async_trait]
impl Tool for SummarizeEpisodeTool {
    fn name(&self) -> &str {
        "summarize_episode"
    }

    fn description(&self) -> &str {
        "Look an episode up in the season's episode table, extract its plot summary, and return a short prose summary."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "episode",
                PropertySchema::string("Episode number or title, matched exactly against the episode table"),
                true,
            ),
        )
    }

    // Every outcome crosses this boundary as text; structured errors stop here.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: SummarizeArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid arguments: {e}"))),
        };

        Ok(match self.summarize(&args.episode).await {
            Ok(Some(summary)) => ToolOutput::success(summary),
            Ok(None) => ToolOutput::success(format!(
                "Couldn't find a plot summary for episode \"{}\". It may not be listed in the \
                 episode table yet, or its page has no plot summary section.",
                args.episode
            )),
            Err(e) => {
                error!(episode = %args.episode, error = %e, "summarize_episode failed");
                ToolOutput::error(render_error(&e))
            }
        })
    }
}

fn render_error(error: &Error) -> String {
    match error {
        Error::Browser(message) => format!(
            "The browser session could not be used: {message}. Likely causes: no \
             Chrome/Chromium binary installed, or the environment does not allow \
             spawning it."
        ),
        Error::Navigation { status, url } => {
            format!("Failed to load {url} (last HTTP status {status}). The site may be down or blocking requests.")
        }
        Error::Timeout(message) => format!("The page took too long to load: {message}."),
        other => format!("Episode lookup failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use recap_core::testing::MockProvider;
    use recap_scrape::testing::{FakeBrowser, FakeLauncher};
    use recap_scrape::{ScrapeConfig, SessionManager};
    use serde_json::json;

    const INDEX_URL: &str = "https://wiki.test/Andor_Season_2";
    const EPISODE_URL: &str = "https://wiki.test/wiki/Catalyst";

    const INDEX_HTML: &str = r#"
        <html><body>
        <table>
          <tr><td>1</td><td>2025-04-22</td><td><a href="/wiki/Catalyst">Catalyst</a></td></tr>
        </table>
        </body></html>
    "#;

    const EPISODE_HTML: &str = r#"
        <html><body>
        <h2>Plot Summary</h2>
        <h3>Catalyst</h3>
        <p>Cassian escapes.</p>
        <div>Credits</div>
        </body></html>
    "#;

    fn tool_with(
        browser: Arc<FakeBrowser>,
        provider: Arc<MockProvider>,
    ) -> SummarizeEpisodeTool {
        let launcher = Arc::new(FakeLauncher::with_browser(browser));
        let sessions = Arc::new(SessionManager::new(
            launcher,
            std::time::Duration::from_secs(300),
        ));
        let scraper = EpisodeScraper::new(
            sessions,
            ScrapeConfig {
                index_url: INDEX_URL.to_string(),
                ..Default::default()
            },
        );
        SummarizeEpisodeTool::new(scraper, provider)
    }

    #[tokio::test]
    async fn summarizes_found_episode() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 200, EPISODE_HTML);

        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Cassian gets away.");

        let tool = tool_with(browser, provider.clone());
        let output = tool.execute(json!({"episode": "1"})).await.unwrap();

        assert!(!output.is_error);
        assert_eq!(output.content, "Cassian gets away.");

        // The provider saw the extracted text and the episode identifier.
        let request = provider.last_request().unwrap();
        let user = request
            .messages
            .iter()
            .find(|m| m.role == recap_core::Role::User)
            .unwrap();
        assert!(user.content.contains("Episode: 1"));
        assert!(user.content.contains("Cassian escapes."));
    }

    #[tokio::test]
    async fn unknown_episode_is_a_friendly_not_found() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);

        let provider = Arc::new(MockProvider::new());
        let tool = tool_with(browser, provider.clone());

        let output = tool.execute(json!({"episode": "99"})).await.unwrap();

        assert!(!output.is_error);
        assert!(output.content.contains("99"));
        // No model call for a not-found outcome.
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn launch_failure_becomes_text_error() {
        let browser = Arc::new(FakeBrowser::new());
        let launcher = Arc::new(FakeLauncher::with_browser(browser));
        launcher.fail_next_launch("no chrome binary");
        let sessions = Arc::new(SessionManager::new(
            launcher,
            std::time::Duration::from_secs(300),
        ));
        let scraper = EpisodeScraper::new(
            sessions,
            ScrapeConfig {
                index_url: INDEX_URL.to_string(),
                ..Default::default()
            },
        );
        let tool = SummarizeEpisodeTool::new(scraper, Arc::new(MockProvider::new()));

        let output = tool.execute(json!({"episode": "1"})).await.unwrap();
        assert!(output.is_error);
        assert!(output.content.contains("no chrome binary"));
        assert!(output.content.contains("Chrome"));
    }

    #[tokio::test]
    async fn navigation_failure_reports_last_status() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 500, "<html></html>");

        let tool = tool_with(browser, Arc::new(MockProvider::new()));
        let output = tool.execute(json!({"episode": "1"})).await.unwrap();

        assert!(output.is_error);
        assert!(output.content.contains("500"));
    }

    #[tokio::test]
    async fn bad_arguments_become_text_error() {
        let browser = Arc::new(FakeBrowser::new());
        let tool = tool_with(browser, Arc::new(MockProvider::new()));

        let output = tool.execute(json!({"wrong": true})).await.unwrap();
        assert!(output.is_error);
        assert!(output.content.contains("Invalid arguments"));
    }
}

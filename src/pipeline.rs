use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{error, info, warn};

use crate::auth;
use crate::budget::{ErrorBudget, ResetPolicy};
use crate::config::{Config, SearchConfig};
use crate::extract::LinkExtractor;
use crate::fetch::{PageFetcher, search_url};
use crate::input::load_lines;
use crate::notify::AlertSink;
use crate::youtube::{CommentApi, post_comment};

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub keywords: usize,
    pub fetch_failures: usize,
    pub videos: usize,
    pub posted: usize,
    pub post_failures: usize,
    pub alerts_sent: usize,
}

/// Picks one comment uniformly at random, with replacement.
pub fn pick_comment<'a, R: rand::Rng + ?Sized>(comments: &'a [String], rng: &mut R) -> Option<&'a str> {
    comments.choose(rng).map(String::as_str)
}

/// Drives keyword search, comment posting and the error budget for one run.
pub struct Pipeline<'a> {
    fetcher: PageFetcher,
    extractor: LinkExtractor,
    search: SearchConfig,
    api: &'a dyn CommentApi,
    alerts: &'a dyn AlertSink,
    budget: ErrorBudget,
    policy: ResetPolicy,
    rng: StdRng,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fetcher: PageFetcher,
        extractor: LinkExtractor,
        search: SearchConfig,
        api: &'a dyn CommentApi,
        alerts: &'a dyn AlertSink,
        budget: ErrorBudget,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            search,
            api,
            alerts,
            budget,
            policy: ResetPolicy::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn budget(&self) -> &ErrorBudget {
        &self.budget
    }

    /// Processes every keyword in order. Returns `None` without touching the
    /// network when either input list is empty.
    pub async fn run(&mut self, keywords: &[String], comments: &[String]) -> Option<RunSummary> {
        if keywords.is_empty() || comments.is_empty() {
            error!("Required data is missing. Exiting.");
            return None;
        }

        let mut summary = RunSummary::default();

        for keyword in keywords {
            summary.keywords += 1;

            let video_ids = match self.search_videos(keyword).await {
                Some(ids) => ids,
                None => {
                    summary.fetch_failures += 1;
                    continue;
                }
            };
            info!(keyword = keyword.as_str(), found = video_ids.len(), "Search complete");

            for video_id in video_ids.iter().filter(|id| !id.is_empty()) {
                summary.videos += 1;

                let Some(comment) = pick_comment(comments, &mut self.rng) else {
                    continue;
                };

                match post_comment(self.api, video_id, comment, &self.budget).await {
                    Ok(_) => summary.posted += 1,
                    Err(_) => summary.post_failures += 1,
                }

                if self.check_budget().await {
                    summary.alerts_sent += 1;
                }
            }
        }

        Some(summary)
    }

    async fn search_videos(&self, keyword: &str) -> Option<Vec<String>> {
        let url = match search_url(&self.search.url, &self.search.filter, keyword) {
            Ok(url) => url,
            Err(e) => {
                error!("Error scraping video links for keyword '{}': {}", keyword, e);
                return Some(Vec::new());
            }
        };

        let html = self.fetcher.fetch(url.as_str(), &self.budget).await.ok()?;
        Some(self.extractor.extract_video_ids(&html))
    }

    /// Sends an alert when the budget is exhausted. Returns whether a send
    /// succeeded.
    async fn check_budget(&self) -> bool {
        let Some(count) = self.budget.take_if_due() else {
            return false;
        };

        match self.alerts.send_alert(count).await {
            Ok(()) => true,
            Err(e) => {
                error!(error_count = count, "Failed to send error notification email: {}", e);
                if self.policy == ResetPolicy::OnDelivery {
                    warn!("Keeping error count until an alert is delivered");
                    self.budget.restore(count);
                }
                false
            }
        }
    }
}

/// Authenticates, loads both input files and runs the pipeline once.
///
/// Returns `Ok(None)` when authentication fails or an input list is empty; in
/// both cases nothing is fetched or posted.
pub async fn run_with_config(
    config: &Config,
    alerts: &dyn AlertSink,
) -> anyhow::Result<Option<RunSummary>> {
    // One HTTP session for the whole run, dropped on every exit path
    let fetcher = PageFetcher::new(config.proxy_url.as_deref())?;
    let extractor = LinkExtractor::new(&config.search.link_selector, config.search.link_prefix.clone())?;

    let client = match auth::authenticate(
        &config.client_secrets_file,
        &config.youtube,
        reqwest::Client::new(),
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Authentication failed: {e}");
            error!("Unable to initialize YouTube API client. Exiting.");
            return Ok(None);
        }
    };

    let keywords = load_lines(&config.keywords_file);
    let comments = load_lines(&config.comments_file);

    let mut pipeline = Pipeline::new(
        fetcher,
        extractor,
        config.search.clone(),
        &client,
        alerts,
        ErrorBudget::new(config.max_errors_before_email),
    )
    .with_reset_policy(config.reset_policy);

    Ok(pipeline.run(&keywords, &comments).await)
}

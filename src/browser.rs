use crate::config::BrowserConfig;
use crate::CrawlerError;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Loads a URL and hands back the rendered document.
#[async_trait::async_trait]
pub trait PageFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, CrawlerError>;
}

/// One headless Chromium with a single page reused for every URL.
pub struct ChromiumFetcher {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumFetcher {
    pub async fn launch(config: &BrowserConfig) -> Result<ChromiumFetcher, CrawlerError> {
        let mut builder = chromiumoxide::BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = config
            .executable
            .clone()
            .or_else(|| std::env::var_os("CHROME").map(Into::into))
        {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(CrawlerError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("Browser event error: {}", err);
                }
            }
        });
        info!("Open Browser");

        let page = browser.new_page("about:blank").await?;
        info!("Create new page");

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(config.viewport.width),
            i64::from(config.viewport.height),
            1.0,
            false,
        ))
        .await?;
        info!(
            "Set Viewport {}x{}",
            config.viewport.width, config.viewport.height
        );

        Ok(ChromiumFetcher {
            browser,
            page,
            handler,
        })
    }

    pub async fn close(mut self) -> Result<(), CrawlerError> {
        self.browser.close().await?;
        self.browser.wait().await?;
        if let Err(err) = self.handler.await {
            debug!("Browser handler task ended abnormally: {}", err);
        }
        info!("Close Browser");
        Ok(())
    }
}

#[async_trait::async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, CrawlerError> {
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        info!("Fetched: {}", url);
        Ok(self.page.content().await?)
    }
}

use crate::{browser::PageFetcher, CrawlerError, Extractor, Record, UrlEntry};
use scraper::Html;
use tracing::{debug, error, info};

/// Visit every url in order and push one record per url into `records`.
///
/// Stops at the first navigation or extraction error. Records pushed before
/// the failure stay in `records`.
pub async fn process<F>(
    fetcher: &mut F,
    urls: &[UrlEntry],
    extractor: &Extractor,
    records: &mut Vec<Record>,
) -> Result<(), CrawlerError>
where
    F: PageFetcher + Send,
{
    for entry in urls {
        debug!("Visit {}", entry.url);
        let html = fetcher.fetch(&entry.url).await?;

        let mut record = {
            let doc = Html::parse_document(&html);
            extractor.extract(&doc, &entry.url)?
        };
        record.insert("date".to_string(), entry.date.clone());

        records.push(record);
    }

    info!("Processed Urls");
    Ok(())
}

/// Outcome of a run once the browser is closed. A crawl failure is reported
/// ahead of a failure to close the browser.
pub fn settle(
    processed: Result<(), CrawlerError>,
    closed: Result<(), CrawlerError>,
    done: usize,
    total: usize,
) -> Result<(), CrawlerError> {
    match (processed, closed) {
        (Err(err), closed) => {
            error!("Crawl aborted after {} of {} urls", done, total);
            if let Err(close_err) = closed {
                error!(error = ?close_err, "Unable to close browser");
            }
            Err(err)
        }
        (Ok(()), closed) => closed,
    }
}

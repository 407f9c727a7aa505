use crate::error::SyncError;
use crate::models::VideoLink;
use crate::services::link_log::LinkLog;
use crate::services::youtube::MetadataService;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::str::FromStr;

/// What to do when a listing turns out not to be newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCheck {
    Fail,
    Warn,
}

impl FromStr for OrderCheck {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(OrderCheck::Fail),
            "warn" => Ok(OrderCheck::Warn),
            other => Err(SyncError::MalformedInput(format!("unknown order check '{other}'"))),
        }
    }
}

/// Walks `links` newest-first, keeping (and logging) every link published at or after `since`,
/// and stops at the first older one. Requires the listing to be reverse-chronological;
/// a link newer than its predecessor trips `order_check`.
///
/// A failed date lookup skips that link only.
pub async fn filter_links(
    metadata: &dyn MetadataService,
    links: &[VideoLink],
    since: Option<DateTime<Utc>>,
    log: &LinkLog,
    order_check: OrderCheck,
) -> Result<Vec<VideoLink>, SyncError> {
    let mut kept = Vec::new();
    let mut previous: Option<(DateTime<Utc>, &str)> = None;

    for link in links {
        let published = match metadata.published_at(&link.item_id).await {
            Ok(published) => published,
            Err(e) => {
                warn!("Could not get publish date for {}: {e}", link.raw_url);
                continue;
            }
        };

        if let Some((previous_date, previous_id)) = previous {
            if published > previous_date {
                let message = format!(
                    "{} ({published}) is newer than the preceding {previous_id} ({previous_date})",
                    link.item_id
                );
                match order_check {
                    OrderCheck::Fail => {
                        error!("Listing out of order: {message}");
                        return Err(SyncError::ListingOutOfOrder(message));
                    }
                    OrderCheck::Warn => warn!("Listing out of order: {message}"),
                }
            }
        }
        previous = Some((published, &link.item_id));

        match since {
            Some(cutoff) if published < cutoff => {
                info!(
                    "Reached cutoff at {} (published {published}, cutoff {cutoff})",
                    link.raw_url
                );
                return Ok(kept);
            }
            _ => {
                log.append(link).await?;
                kept.push(link.clone());
            }
        }
    }

    Ok(kept)
}

//! Daily farming tip, generated once per day and cached

use chrono::{Datelike, Duration as DateDuration, Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::genai::{GenerationBackend, GenerationRequest, Message};
use crate::prompts::{FALLBACK_TIPS, FARMING_TIP_PROMPT};
use crate::store::Store;

/// How long a generated tip stays cached
pub const TIP_TTL: Duration = Duration::from_secs(60 * 60 * 48);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTip {
    pub tip: String,
    pub cached: bool,
    pub fallback: bool,
    pub date: NaiveDate,
}

pub fn cache_key(date: NaiveDate) -> String {
    format!("farming_tip_{}", date.format("%Y-%m-%d"))
}

pub struct TipService {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn Store>,
    model: String,
}

impl TipService {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn Store>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            model: model.into(),
        }
    }

    pub async fn daily_tip(&self) -> DailyTip {
        self.tip_for(Local::now().date_naive()).await
    }

    /// Cached tip for `today`, a freshly generated one, or a fallback. Never fails.
    pub async fn tip_for(&self, today: NaiveDate) -> DailyTip {
        let key = cache_key(today);

        match self.store.cached_tip(&key).await {
            Ok(Some(tip)) => {
                info!("Returning cached tip for {}", today);
                return DailyTip {
                    tip,
                    cached: true,
                    fallback: false,
                    date: today,
                };
            }
            Ok(None) => {}
            Err(e) => warn!("Tip cache lookup failed: {}", e),
        }

        info!("Generating new tip for {}", today);
        match self.generate().await {
            Ok(tip) => {
                if let Err(e) = self.store.cache_tip(&key, &tip, TIP_TTL).await {
                    warn!("Failed to cache tip: {}", e);
                }
                DailyTip {
                    tip,
                    cached: false,
                    fallback: false,
                    date: today,
                }
            }
            Err(e) => {
                error!("Error generating farming tip: {}", e);
                self.fallback(today).await
            }
        }
    }

    async fn generate(&self) -> crate::Result<String> {
        let request = GenerationRequest::new(&self.model, vec![Message::user(FARMING_TIP_PROMPT)])
            .with_temperature(0.8)
            .with_top_p(0.9)
            .with_max_output_tokens(150);

        let tip = self.backend.generate_text(request).await?;
        let tip = tip.trim();
        if tip.is_empty() {
            return Err(crate::Error::EmptyResponse);
        }
        Ok(tip.to_string())
    }

    async fn fallback(&self, today: NaiveDate) -> DailyTip {
        let yesterday = today - DateDuration::days(1);
        if let Ok(Some(tip)) = self.store.cached_tip(&cache_key(yesterday)).await {
            info!("Returning yesterday's tip as fallback");
            return DailyTip {
                tip,
                cached: true,
                fallback: true,
                date: yesterday,
            };
        }

        info!("Returning default fallback tip");
        let index = today.ordinal0() as usize % FALLBACK_TIPS.len();
        DailyTip {
            tip: FALLBACK_TIPS[index].to_string(),
            cached: false,
            fallback: true,
            date: today,
        }
    }
}

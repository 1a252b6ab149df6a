use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use surfcast_models::config::ContextConfig;
use surfcast_models::context::SurfContextPayload;
use surfcast_models::spot::SurfSpotContext;
use tracing::{debug, info};

use crate::cache::PromptCache;
use crate::error::ContextError;
use crate::normalizer::{group_by_spot, normalize_spot_forecast};
use crate::prompts::context_prompt;
use crate::sources::{ForecastSource, SpotSource};

/// Forecast points kept per spot after downsampling.
pub const MAX_POINTS_PER_SPOT: usize = 20;

/// Builds the surf context prompt from the two providers and caches it.
pub struct ContextBuilder {
    spots: Arc<dyn SpotSource>,
    forecasts: Arc<dyn ForecastSource>,
    cache: Arc<PromptCache>,
    settings: ContextConfig,
}

impl ContextBuilder {
    pub fn new(
        spots: Arc<dyn SpotSource>,
        forecasts: Arc<dyn ForecastSource>,
        cache: Arc<PromptCache>,
        settings: ContextConfig,
    ) -> Self {
        Self {
            spots,
            forecasts,
            cache,
            settings,
        }
    }

    /// Return the cached prompt while it is valid, otherwise rebuild it from
    /// the providers and cache the result for the configured TTL.
    pub async fn system_prompt(&self) -> Result<String, ContextError> {
        if let Some(prompt) = self.cache.get() {
            debug!(length = prompt.len(), "Serving cached surf context");
            return Ok(prompt);
        }

        let now = self.cache.now();
        let payload = self.build_payload(now).await?;
        let prompt = context_prompt(&payload)?;

        let ttl_minutes = self.settings.resolved_ttl_minutes();
        let entry = self
            .cache
            .store(prompt.clone(), Duration::minutes(i64::from(ttl_minutes)));
        info!(
            spots = payload.spots.len(),
            length = prompt.len(),
            expires_at = %entry.expires_at,
            "Surf context refreshed"
        );

        Ok(prompt)
    }

    /// Fetch spots and forecasts for `[now, now + lookahead]` and assemble
    /// the payload. Does not touch the cache.
    pub async fn build_payload(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SurfContextPayload, ContextError> {
        let lookahead_hours = self.settings.resolved_lookahead_hours();

        let spots = self.spots.fetch_spots().await?;
        if spots.is_empty() {
            return Err(ContextError::NoSpots);
        }

        let window_end = now + Duration::hours(i64::from(lookahead_hours));
        let spot_ids: Vec<String> = spots.iter().map(|s| s.id.clone()).collect();
        let rows = self
            .forecasts
            .fetch_forecasts(&spot_ids, now, window_end)
            .await?;
        debug!(
            spots = spots.len(),
            rows = rows.len(),
            "Fetched surf data"
        );

        let grouped = group_by_spot(rows);
        let contexts = spots
            .iter()
            .map(|spot| {
                let forecast = grouped
                    .get(&spot.id)
                    .map(|rows| normalize_spot_forecast(rows, MAX_POINTS_PER_SPOT))
                    .unwrap_or_default();
                SurfSpotContext::new(spot, forecast)
            })
            .collect();

        Ok(SurfContextPayload {
            generated_at_utc: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            forecast_horizon_hours: lookahead_hours,
            spots: contexts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use surfcast_models::forecast::RawForecastRow;
    use surfcast_models::spot::SpotMetadata;

    struct FixedSpots(Vec<SpotMetadata>);

    #[async_trait]
    impl SpotSource for FixedSpots {
        async fn fetch_spots(&self) -> Result<Vec<SpotMetadata>, ContextError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingForecasts {
        rows: Vec<RawForecastRow>,
        windows: Mutex<Vec<(Vec<String>, DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl ForecastSource for RecordingForecasts {
        async fn fetch_forecasts(
            &self,
            spot_ids: &[String],
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<RawForecastRow>, ContextError> {
            self.windows
                .lock()
                .unwrap()
                .push((spot_ids.to_vec(), start, end));
            Ok(self.rows.clone())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn builder(
        spots: Vec<SpotMetadata>,
        forecasts: Arc<RecordingForecasts>,
        settings: ContextConfig,
    ) -> ContextBuilder {
        let cache = Arc::new(PromptCache::new(Arc::new(ManualClock::new(start()))));
        ContextBuilder::new(Arc::new(FixedSpots(spots)), forecasts, cache, settings)
    }

    #[tokio::test]
    async fn payload_joins_spots_with_forecasts() {
        let mut rows: Vec<RawForecastRow> = (0..48)
            .map(|h| {
                RawForecastRow::at(
                    "spot-1",
                    &(start() + Duration::hours(h)).to_rfc3339(),
                )
            })
            .collect();
        rows.push(RawForecastRow::at("unknown-spot", "2024-01-01T00:00:00Z"));
        let forecasts = Arc::new(RecordingForecasts {
            rows,
            ..Default::default()
        });

        let b = builder(
            vec![SpotMetadata::with_id("spot-1"), SpotMetadata::with_id("spot-2")],
            forecasts.clone(),
            ContextConfig {
                lookahead_hours: Some(48),
                ttl_minutes: None,
            },
        );
        let payload = b.build_payload(start()).await.unwrap();

        assert_eq!(payload.generated_at_utc, "2024-01-01T00:00:00.000Z");
        assert_eq!(payload.forecast_horizon_hours, 48);
        assert_eq!(payload.spots.len(), 2);
        assert!(payload.spots[0].forecast_count <= MAX_POINTS_PER_SPOT + 1);
        assert_eq!(
            payload.spots[0].forecast_end_utc,
            Some((start() + Duration::hours(47)).to_rfc3339())
        );
        assert_eq!(payload.spots[1].forecast_count, 0);

        let windows = forecasts.windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].0, vec!["spot-1", "spot-2"]);
        assert_eq!(windows[0].1, start());
        assert_eq!(windows[0].2, start() + Duration::hours(48));
    }

    #[tokio::test]
    async fn empty_spot_list_is_no_spots_error() {
        let forecasts = Arc::new(RecordingForecasts::default());
        let b = builder(vec![], forecasts.clone(), ContextConfig::default());

        let result = b.system_prompt().await;
        assert!(matches!(result, Err(ContextError::NoSpots)));
        assert!(forecasts.windows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_lookahead_applies() {
        let forecasts = Arc::new(RecordingForecasts::default());
        let b = builder(
            vec![SpotMetadata::with_id("spot-1")],
            forecasts.clone(),
            ContextConfig {
                lookahead_hours: Some(-1),
                ttl_minutes: None,
            },
        );
        let payload = b.build_payload(start()).await.unwrap();
        assert_eq!(payload.forecast_horizon_hours, 168);
        assert_eq!(
            forecasts.windows.lock().unwrap()[0].2,
            start() + Duration::hours(168)
        );
    }
}

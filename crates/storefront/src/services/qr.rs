//! Entry pass QR codes.
//!
//! The backend hands out a JSON payload per visitor; it is serialized and
//! encoded as an SVG QR code. Rendered codes are cached for five minutes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use qrcode::QrCode;
use qrcode::render::svg;
use thiserror::Error;

use celesta_core::UserHandle;

use crate::services::backend::{BackendApi, BackendError};
use crate::services::identity::BearerToken;

/// Errors that can occur while producing a pass.
#[derive(Debug, Error)]
pub enum QrError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("encode error: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Encode `payload` as an SVG QR code.
///
/// # Errors
///
/// Returns error if the payload is too large for a QR code.
pub fn render_svg(payload: &serde_json::Value) -> Result<String, QrError> {
    let code = QrCode::new(payload.to_string().as_bytes())?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(220, 220)
        .quiet_zone(true)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Per-visitor cache of rendered passes.
#[derive(Clone)]
pub struct QrPasses {
    cache: Cache<UserHandle, Arc<str>>,
}

impl Default for QrPasses {
    fn default() -> Self {
        Self::new()
    }
}

impl QrPasses {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(5_000)
            .time_to_live(Duration::from_secs(300))
            .build();
        Self { cache }
    }

    /// The visitor's pass, fetched and rendered on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be fetched or encoded.
    pub async fn svg_for(
        &self,
        user: &UserHandle,
        backend: &dyn BackendApi,
        token: &BearerToken,
    ) -> Result<Arc<str>, QrError> {
        if let Some(svg) = self.cache.get(user).await {
            return Ok(svg);
        }

        let payload = backend.qr_payload(token).await?;
        let svg: Arc<str> = render_svg(&payload)?.into();
        self.cache.insert(user.clone(), Arc::clone(&svg)).await;
        Ok(svg)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::backend::MockBackendApi;

    #[test]
    fn test_render_svg() {
        let svg = render_svg(&serde_json::json!({"celestaId": "CEL-0042"})).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }

    #[tokio::test]
    async fn test_pass_is_cached() {
        let mut backend = MockBackendApi::new();
        backend
            .expect_qr_payload()
            .times(1)
            .returning(|_| Ok(serde_json::json!({"celestaId": "CEL-0042"})));

        let passes = QrPasses::new();
        let user = UserHandle::new("uid-1");
        let token = BearerToken::new("t");

        let first = passes.svg_for(&user, &backend, &token).await.unwrap();
        let second = passes.svg_for(&user, &backend, &token).await.unwrap();
        assert_eq!(first, second);
    }
}

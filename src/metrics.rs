//! Prometheus counters for the media library.
//!
//! HTTP request metrics come from the `actix-web-prometheus` middleware at
//! `/metrics`; these domain counters live in their own registry and are
//! served at `/metrics/media`.

use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::storage::RemoveOutcome;

lazy_static! {
    pub static ref MEDIA_REGISTRY: Registry = Registry::new();
    static ref UPLOADS: IntCounterVec = register_counter_vec(
        "media_uploads_total",
        "Completed uploads by outcome",
        &["outcome"],
    );
    static ref FILE_REMOVALS: IntCounterVec = register_counter_vec(
        "media_file_removals_total",
        "Physical file removals by outcome",
        &["outcome"],
    );
    static ref ORPHANS_RECLAIMED: IntCounter = {
        let counter = IntCounter::new(
            "media_orphans_reclaimed_total",
            "Files removed after losing a concurrent insert of identical content",
        )
        .expect("valid counter options");
        MEDIA_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("counter registered once");
        counter
    };
}

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels).expect("valid counter options");
    MEDIA_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

pub fn record_upload(is_new: bool) {
    let outcome = if is_new { "new" } else { "duplicate" };
    UPLOADS.with_label_values(&[outcome]).inc();
}

pub fn record_removal(outcome: &RemoveOutcome) {
    FILE_REMOVALS.with_label_values(&[outcome.label()]).inc();
}

pub fn record_orphan_reclaimed() {
    ORPHANS_RECLAIMED.inc();
}

/// Text exposition of every media counter.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&MEDIA_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub async fn media_metrics() -> impl Responder {
    match render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            log::error!("Failed to encode media metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

use std::fmt::Write as _;
use prometheus_client::{
    encoding::{text::encode, EncodeLabelSet, EncodeLabelValue, LabelValueEncoder},
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::{Metric, Registry, Unit},
};

use crate::{prelude::*, store::Store};


struct MetricDesc {
    name: &'static str,
    help: &'static str,
    unit: Option<Unit>,
}

const HTTP_REQUESTS: MetricDesc = MetricDesc {
    name: "http_requests",
    help: "Number of incoming HTTP requests",
    unit: None,
};
const STORE_CALLS: MetricDesc = MetricDesc {
    name: "store_calls",
    help: "Number of calls to the entity store made while answering API requests",
    unit: None,
};
const BUILD_INFO: MetricDesc = MetricDesc {
    name: "build_info",
    help: "Different information about the app",
    unit: None,
};
const NUM_ITEMS: MetricDesc = MetricDesc {
    name: "num_items",
    help: "Number of different kinds of items in the store",
    unit: None,
};


pub(crate) struct Metrics {
    http_requests: Family<HttpReqLabels, Counter>,
    store_calls: Counter,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self {
            http_requests: <Family<HttpReqLabels, Counter>>::default(),
            store_calls: <Counter>::default(),
        }
    }

    pub(crate) fn register_http_req(&self, category: HttpReqCategory) {
        self.http_requests.get_or_create(&HttpReqLabels { category }).inc();
    }

    pub(crate) fn register_store_calls(&self, num_calls: u32) {
        self.store_calls.inc_by(num_calls.into());
    }

    pub(crate) async fn gather_and_encode(&self, store: &dyn Store) -> String {
        let mut reg = <Registry>::default();

        add_any(&mut reg, HTTP_REQUESTS, self.http_requests.clone());
        add_any(&mut reg, STORE_CALLS, self.store_calls.clone());

        let info = <Family<Vec<(String, String)>, Gauge>>::default();
        info.get_or_create(&vec![
            ("version".into(), crate::version::identifier()),
            ("build_time_utc".into(), crate::version::build_time_utc().into()),
            ("store".into(), store.name().into()),
        ]).set(1);
        add_any(&mut reg, BUILD_INFO, info);

        // Failing store calls just leave out the gauge.
        let item_count = <Family<ItemLabels, Gauge>>::default();
        match store.books().await {
            Ok(books) => {
                item_count.get_or_create(&ItemLabels { kind: ItemKind::Book })
                    .set(books.len() as i64);
            }
            Err(e) => warn!("Failed to count books for metrics: {e}"),
        }
        match store.authors().await {
            Ok(authors) => {
                item_count.get_or_create(&ItemLabels { kind: ItemKind::Author })
                    .set(authors.len() as i64);
            }
            Err(e) => warn!("Failed to count authors for metrics: {e}"),
        }
        add_any(&mut reg, NUM_ITEMS, item_count);

        let mut out = String::new();
        if let Err(e) = encode(&mut out, &reg) {
            error!("Failed to encode Prometheus metrics: {e}");
        }
        out
    }
}

fn add_any(reg: &mut Registry, metric: MetricDesc, value: impl Metric) {
    let name = format!("libris_{}", metric.name);
    match metric.unit {
        Some(unit) => reg.register_with_unit(name, metric.help, unit, value),
        None => reg.register(name, metric.help, value),
    }
}


#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct HttpReqLabels {
    category: HttpReqCategory,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub(crate) enum HttpReqCategory {
    /// `POST /api`
    GraphQL,
    /// `GET /~graphiql`
    GraphiQL,
    /// `GET /~metrics`
    Metrics,
    /// CORS preflight requests
    Preflight,
    /// Everything else
    Other,
}

impl EncodeLabelValue for HttpReqCategory {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> Result<(), std::fmt::Error> {
        encoder.write_str(match self {
            Self::GraphQL => "graphql",
            Self::GraphiQL => "graphiql",
            Self::Metrics => "metrics",
            Self::Preflight => "preflight",
            Self::Other => "other",
        })
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ItemLabels {
    kind: ItemKind,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum ItemKind {
    Book,
    Author,
}

impl EncodeLabelValue for ItemKind {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> Result<(), std::fmt::Error> {
        encoder.write_str(match self {
            Self::Book => "book",
            Self::Author => "author",
        })
    }
}

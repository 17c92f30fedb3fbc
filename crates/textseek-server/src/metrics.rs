use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Histogram, HistogramVec,
    IntCounterVec,
};

pub static SEARCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("search_requests_total", "Search requests by op", &["op"]).unwrap()
});

pub static SEARCH_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "search_errors_total",
        "Search errors by op and kind",
        &["op", "kind"]
    )
    .unwrap()
});

pub static SEARCH_QUERY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "search_query_seconds",
        "Search latency including the store round trip",
        &["op"],
        vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap()
});

pub static SEARCH_PAGE_ITEMS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "search_page_items",
        "Items returned per response",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .unwrap()
});

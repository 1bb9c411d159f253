//! Report assembly: one pipeline shared by every view.
//!
//! [`assemble`] is pure: it takes already loaded extracts and a
//! [`ViewSpec`] and returns a [`ViewReport`]. [`Dashboard`] adds the I/O
//! around it (fetch, cache, parse) and tags failures with the view name.

use std::collections::HashMap;
use std::time::Duration;

use dash_core::error::{DashError, Result};
use dash_core::models::{CategoricalDistribution, DateRange, MetricBundle, RecordSet, TimeSeries};
use dash_core::time_utils::TimezoneHandler;
use dash_data::aggregator::{aggregate, group_by_period};
use dash_data::filter::{filter_range, filter_range_on, select_where};
use dash_data::join::inner_join;
use dash_data::loader::load_bytes;
use dash_data::projection::{Projection, Table};
use dash_data::summarizer::{distribution, head, normalize, top_k_plus_other};
use serde::Serialize;
use tracing::{debug, info};

use crate::data_manager::DataManager;
use crate::views::{ChartKind, ChartSource, ChartSpec, DatasetKey, Shape, ViewKind, ViewSpec};

// ── Report types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "points", rename_all = "lowercase")]
pub enum ChartData {
    Series(TimeSeries),
    Distribution(CategoricalDistribution),
}

impl ChartData {
    /// `(label, value)` pairs regardless of the underlying shape.
    pub fn points(&self) -> &[(String, f64)] {
        match self {
            ChartData::Series(s) => &s.points,
            ChartData::Distribution(d) => &d.entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

/// Everything one view shows for one date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewReport {
    pub view: ViewKind,
    /// The applied range; `None` when the extract has no timestamps at all.
    pub range: Option<DateRange>,
    /// Records of the primary extract inside the range.
    pub record_count: usize,
    pub metrics: MetricBundle,
    pub charts: Vec<Chart>,
    pub table: Table,
}

/// Loaded extracts keyed by dataset.
pub type Datasets = HashMap<DatasetKey, RecordSet>;

// ── Assembly ──────────────────────────────────────────────────────────────────

/// Build the report for `spec` over `datasets`.
///
/// `range` defaults to the observed min/max timestamp dates of the primary
/// extract. `columns` overrides the view's default table columns and must
/// name existing columns.
pub fn assemble(
    spec: &ViewSpec,
    datasets: &Datasets,
    range: Option<DateRange>,
    columns: Option<&[String]>,
) -> Result<ViewReport> {
    let primary = dataset(datasets, spec.dataset)?;
    let range = range.or_else(|| primary.observed_range());

    let filtered = match range {
        Some(r) => filter_range(primary, &r),
        None => primary.with_records(Vec::new()),
    };

    let metrics = aggregate(&filtered, &spec.metrics);
    let charts = spec.charts.iter().map(|c| build_chart(c, &filtered)).collect();

    let table_source = match &spec.join {
        Some(join) => {
            let rows = match (join.table_timestamp, range) {
                (Some(field), Some(r)) => filter_range_on(primary, field, &r),
                _ => filtered.clone(),
            };
            inner_join(
                &rows,
                dataset(datasets, join.dataset)?,
                join.left_key,
                join.right_key,
                join.suffix,
            )
        }
        None => filtered.clone(),
    };
    let table = Projection::resolve(table_source.schema(), columns, &spec.default_columns)?
        .apply(&table_source);

    debug!(
        view = %spec.kind,
        records = filtered.len(),
        rows = table.len(),
        "view assembled"
    );

    Ok(ViewReport {
        view: spec.kind,
        range,
        record_count: filtered.len(),
        metrics,
        charts,
        table,
    })
}

fn dataset(datasets: &Datasets, key: DatasetKey) -> Result<&RecordSet> {
    datasets
        .get(&key)
        .ok_or_else(|| DashError::Load(format!("{} was not loaded", key.object_name())))
}

fn build_chart(spec: &ChartSpec, records: &RecordSet) -> Chart {
    let data = match &spec.source {
        ChartSource::Series { value, period } => ChartData::Series(group_by_period(
            records,
            records.timestamp_field(),
            value,
            *period,
        )),
        ChartSource::Distribution {
            field,
            filter,
            shape,
        } => {
            let base = match filter {
                Some((f, cond)) => select_where(records, f, cond),
                None => records.clone(),
            };
            let dist = distribution(&base, field);
            ChartData::Distribution(match shape {
                Shape::All => dist,
                Shape::Head(n) => head(&dist, *n),
                Shape::TopKPlusOther(k) => top_k_plus_other(&dist, *k),
                Shape::PercentHead(n) => head(&normalize(&dist), *n),
            })
        }
    };
    Chart {
        title: spec.title.to_string(),
        kind: spec.kind,
        x_label: spec.x_label.to_string(),
        y_label: spec.y_label.to_string(),
        data,
    }
}

// ── Dashboard ─────────────────────────────────────────────────────────────────

/// Age of the oldest cached extract a view reads, and the refetch error if
/// any of them is being served stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Freshness {
    pub age: Option<Duration>,
    pub stale_error: Option<String>,
}

/// Fetches, parses and assembles views on demand.
pub struct Dashboard {
    manager: DataManager,
    tz: TimezoneHandler,
}

impl Dashboard {
    pub fn new(manager: DataManager, tz: TimezoneHandler) -> Self {
        info!(source = %manager.source_description(), tz = %tz.source_tz(), "dashboard ready");
        Self { manager, tz }
    }

    /// Fetch and parse one extract.
    pub fn load_dataset(&mut self, key: DatasetKey) -> Result<RecordSet> {
        let bytes = self.manager.get(key.object_name(), false)?;
        load_bytes(&bytes, &key.hints(), &self.tz)
    }

    /// Compute the report for `kind`.
    ///
    /// Any failure is wrapped in [`DashError::View`] naming the view, so
    /// one broken extract only affects the views that read it.
    pub fn run_view(
        &mut self,
        kind: ViewKind,
        range: Option<DateRange>,
        columns: Option<&[String]>,
    ) -> Result<ViewReport> {
        self.run_view_inner(kind, range, columns)
            .map_err(|e| e.in_view(kind.title()))
    }

    fn run_view_inner(
        &mut self,
        kind: ViewKind,
        range: Option<DateRange>,
        columns: Option<&[String]>,
    ) -> Result<ViewReport> {
        let spec = ViewSpec::for_view(kind);
        let mut datasets = Datasets::new();
        for key in spec.datasets() {
            let records = self.load_dataset(key)?;
            datasets.insert(key, records);
        }
        assemble(&spec, &datasets, range, columns)
    }

    /// Drop cached extracts so the next view refetches them.
    pub fn refresh(&mut self) {
        self.manager.invalidate_cache();
    }

    pub fn source_description(&self) -> String {
        self.manager.source_description()
    }

    /// How current the cached extracts behind `kind` are.
    pub fn freshness(&self, kind: ViewKind) -> Freshness {
        let keys = ViewSpec::for_view(kind).datasets();
        Freshness {
            age: keys
                .iter()
                .filter_map(|k| self.manager.cache_age(k.object_name()))
                .max(),
            stale_error: keys
                .iter()
                .find_map(|k| self.manager.stale_error(k.object_name()))
                .map(str::to_string),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dash_core::models::MetricValue;

    use crate::source::MemorySource;

    const INVOICES: &str = "created,customer_id,subscription,total_invoice_amount,tax,net_amount,fee\n\
        2024-01-05 10:00:00,cus_1,sub_1,100,10,90,3\n\
        2024-01-20 11:00:00,cus_2,,200,20,180,6\n\
        2024-02-01 09:00:00,cus_3,sub_2,NaN,0,7,1\n";

    const CUSTOMERS: &str = "created,id,email,name,deleted\n\
        2024-01-03,cus_1,a@x.io,Ann,false\n\
        2024-01-09,cus_2,b@x.io,Ben,true\n\
        2024-02-11,cus_3,c@x.io,Cy,false\n\
        2024-02-12,cus_4,d@x.io,Dee,true\n";

    const SUBSCRIPTIONS: &str = "created,customer_id,status,cancel_at_period_end,trial_end\n\
        2024-01-10,cus_1,active,false,2024-01-24\n\
        2024-01-11,cus_2,canceled,true,\n\
        2024-02-02,cus_9,active,false,\n";

    const PAYMENTS: &str = "id,created_date,status,amount,amount_refunded,refunded,description,failure_code\n\
        py_1,2024-01-01,succeeded,10,0,false,Plan A,\n\
        py_2,2024-01-02,failed,20,0,false,Plan A,card_declined\n\
        py_3,2024-01-03,succeeded,30,30,true,Plan A,\n\
        py_4,2024-01-04,succeeded,40,40,true,Plan B,\n\
        py_5,2024-01-05,succeeded,50,15,true,Plan C,\n\
        py_6,2024-01-06,failed,60,0,false,Plan B,expired_card\n\
        py_7,2024-01-07,pending,70,0,false,Plan B,\n";

    const FINANCIAL: &str = "month,currency,total_sales,total_refunds,total_payouts,net_profit_loss\n\
        2024-01,usd,1000,100,800,100\n\
        2024-02,usd,2000,50,1500,450\n";

    fn source() -> MemorySource {
        MemorySource::new()
            .with(DatasetKey::Invoices.object_name(), INVOICES)
            .with(DatasetKey::Customers.object_name(), CUSTOMERS)
            .with(DatasetKey::Subscriptions.object_name(), SUBSCRIPTIONS)
            .with(DatasetKey::Payments.object_name(), PAYMENTS)
            .with(DatasetKey::Financial.object_name(), FINANCIAL)
    }

    fn dashboard(source: MemorySource) -> Dashboard {
        Dashboard::new(
            DataManager::new(Box::new(source), 60),
            TimezoneHandler::default(),
        )
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn january() -> Option<DateRange> {
        Some(DateRange::new(d(2024, 1, 1), d(2024, 1, 31)))
    }

    fn chart<'a>(report: &'a ViewReport, title: &str) -> &'a Chart {
        report
            .charts
            .iter()
            .find(|c| c.title == title)
            .unwrap_or_else(|| panic!("no chart {title}"))
    }

    #[test]
    fn test_revenue_view() {
        let mut dash = dashboard(source());
        let report = dash.run_view(ViewKind::Revenue, None, None).unwrap();

        assert_eq!(report.range, Some(DateRange::new(d(2024, 1, 5), d(2024, 2, 1))));
        assert_eq!(report.record_count, 3);
        assert_eq!(
            report.metrics.get("total_amount"),
            Some(&MetricValue::Currency(300.0))
        );
        assert_eq!(
            report.metrics.get("total_transactions"),
            Some(&MetricValue::Count(2))
        );
        assert_eq!(
            report.metrics.get("subscriptions_sold"),
            Some(&MetricValue::Count(2))
        );
        let net = chart(&report, "Total Net Amount by Month");
        assert_eq!(
            net.data.points(),
            &[("2024-01".to_string(), 270.0), ("2024-02".to_string(), 7.0)]
        );
        // Default columns the extract lacks are skipped.
        assert_eq!(
            report.table.columns,
            vec!["created", "customer_id", "subscription", "total_invoice_amount", "fee", "tax", "net_amount"]
        );
    }

    #[test]
    fn test_customers_churn_rate() {
        let mut dash = dashboard(source());
        let report = dash.run_view(ViewKind::Customers, january(), None).unwrap();
        assert_eq!(report.metrics.get("total_customers"), Some(&MetricValue::Count(2)));
        assert_eq!(report.metrics.get("churned_customers"), Some(&MetricValue::Count(1)));
        assert_eq!(report.metrics.get("churn_rate"), Some(&MetricValue::Percent(50.0)));
    }

    #[test]
    fn test_empty_range_gives_zeroes_and_undefined_ratio() {
        let mut dash = dashboard(source());
        let range = Some(DateRange::new(d(2023, 1, 1), d(2023, 12, 31)));
        let report = dash.run_view(ViewKind::Customers, range, None).unwrap();
        assert_eq!(report.record_count, 0);
        assert_eq!(report.metrics.get("total_customers"), Some(&MetricValue::Count(0)));
        assert_eq!(report.metrics.get("churn_rate"), Some(&MetricValue::Undefined));
        assert!(report.charts.iter().all(|c| c.data.is_empty()));
        assert!(report.table.is_empty());
    }

    #[test]
    fn test_subscriptions_view_joins_customers_for_table() {
        let mut dash = dashboard(source());
        let report = dash.run_view(ViewKind::Subscriptions, None, None).unwrap();
        assert_eq!(report.metrics.get("active_subscriptions"), Some(&MetricValue::Count(2)));
        assert_eq!(report.metrics.get("cancelling_subscriptions"), Some(&MetricValue::Count(1)));
        assert_eq!(report.metrics.get("active_status"), Some(&MetricValue::Count(2)));
        assert_eq!(report.metrics.get("inactive_status"), Some(&MetricValue::Count(1)));

        // Rows are picked by trial end: cus_2 has none and cus_9 has no
        // customer record.
        assert_eq!(report.table.columns, vec!["name", "email", "trial_end"]);
        assert_eq!(report.table.rows, vec![vec!["Ann", "a@x.io", "2024-01-24"]]);

        let daily = chart(&report, "Daily Active Subscriptions");
        assert_eq!(daily.data.points().len(), 3);
    }

    #[test]
    fn test_subscriptions_table_follows_trial_end_not_created() {
        let subs = "created,customer_id,status,cancel_at_period_end,trial_end\n\
            2024-01-05,cus_1,active,false,2024-02-10\n\
            2024-01-06,cus_2,active,true,2024-01-20\n\
            2024-02-03,cus_3,active,false,2024-03-01\n";
        let mut dash = dashboard(source().with(DatasetKey::Subscriptions.object_name(), subs));
        let february = Some(DateRange::new(d(2024, 2, 1), d(2024, 2, 29)));

        let report = dash.run_view(ViewKind::Subscriptions, february, None).unwrap();
        // Metrics count subscriptions created in February.
        assert_eq!(report.record_count, 1);
        assert_eq!(report.metrics.get("active_subscriptions"), Some(&MetricValue::Count(1)));
        // The table lists customers whose trial ends in February.
        assert_eq!(report.table.rows, vec![vec!["Ann", "a@x.io", "2024-02-10"]]);

        let report = dash.run_view(ViewKind::Subscriptions, january(), None).unwrap();
        assert_eq!(report.record_count, 2);
        assert_eq!(report.table.rows, vec![vec!["Ben", "b@x.io", "2024-01-20"]]);
    }

    #[test]
    fn test_freshness_tracks_cached_extracts() {
        let mut dash = dashboard(source());
        assert_eq!(dash.freshness(ViewKind::Financial), Freshness::default());

        dash.run_view(ViewKind::Financial, None, None).unwrap();
        let fresh = dash.freshness(ViewKind::Financial);
        assert!(fresh.age.is_some_and(|a| a < Duration::from_secs(5)));
        assert!(fresh.stale_error.is_none());
        // Other views' extracts were not fetched.
        assert!(dash.freshness(ViewKind::Revenue).age.is_none());

        dash.refresh();
        assert!(dash.freshness(ViewKind::Financial).age.is_none());
    }

    #[test]
    fn test_payment_view_charts() {
        let mut dash = dashboard(source());
        let report = dash.run_view(ViewKind::Payment, january(), None).unwrap();
        assert_eq!(report.metrics.get("total_transactions"), Some(&MetricValue::Count(7)));
        assert_eq!(report.metrics.get("successful_transactions"), Some(&MetricValue::Count(4)));
        assert_eq!(report.metrics.get("failed_transactions"), Some(&MetricValue::Count(2)));

        let refunded = chart(&report, "Top 2 Refunded Line Items and Others");
        assert_eq!(
            refunded.data.points(),
            &[
                ("Plan A".to_string(), 1.0),
                ("Plan B".to_string(), 1.0),
                ("Other".to_string(), 1.0)
            ]
        );

        let status = chart(&report, "Payment Status Distribution");
        assert_eq!(
            status.data.points(),
            &[("succeeded".to_string(), 4.0), ("failed".to_string(), 2.0)]
        );

        let reasons = chart(&report, "Top 5 Failure Reasons");
        assert_eq!(
            reasons.data.points(),
            &[("card_declined".to_string(), 50.0), ("expired_card".to_string(), 50.0)]
        );

        let amounts = chart(&report, "Most Frequent Refunded Amounts");
        assert_eq!(amounts.data.points().len(), 3);
    }

    #[test]
    fn test_financial_view() {
        let mut dash = dashboard(source());
        let report = dash.run_view(ViewKind::Financial, None, None).unwrap();
        assert_eq!(report.metrics.get("total_sales"), Some(&MetricValue::Currency(3000.0)));
        assert_eq!(report.metrics.get("net_profit_loss"), Some(&MetricValue::Currency(550.0)));
        assert_eq!(report.charts.len(), 4);
        assert_eq!(report.table.rows[0][0], "2024-01-01");
    }

    #[test]
    fn test_unknown_columns_surface_as_view_error() {
        let mut dash = dashboard(source());
        let cols = vec!["name".to_string(), "shoe_size".to_string()];
        let err = dash
            .run_view(ViewKind::Customers, None, Some(&cols))
            .unwrap_err();
        match err {
            DashError::View { view, source } => {
                assert_eq!(view, "Customers");
                assert!(matches!(*source, DashError::UnknownColumns(ref c) if c == &["shoe_size"]));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_extract_fails_only_that_view() {
        let partial = MemorySource::new().with(DatasetKey::Financial.object_name(), FINANCIAL);
        let mut dash = dashboard(partial);

        let err = dash.run_view(ViewKind::Revenue, None, None).unwrap_err();
        assert!(err.to_string().starts_with("Revenue view failed"), "{err}");
        assert!(dash.run_view(ViewKind::Financial, None, None).is_ok());
    }

    #[test]
    fn test_malformed_extract_is_view_error() {
        let broken = source().with(DatasetKey::Financial.object_name(), "month,total_sales\n2024-01,1,2\n");
        let mut dash = dashboard(broken);
        let err = dash.run_view(ViewKind::Financial, None, None).unwrap_err();
        match err {
            DashError::View { source, .. } => assert!(matches!(*source, DashError::Load(_))),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_report_serializes() {
        let mut dash = dashboard(source());
        let report = dash.run_view(ViewKind::Payment, january(), None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["view"], "payment");
        assert_eq!(json["record_count"], 7);
        assert_eq!(json["metrics"]["metrics"][0]["value"]["kind"], "count");
        assert_eq!(json["charts"][0]["data"]["type"], "distribution");
    }

    #[test]
    fn test_assemble_without_timestamps_is_empty() {
        let spec = ViewSpec::for_view(ViewKind::Financial);
        let records = dash_data::loader::load(
            "month,total_sales\nnot-a-date,5\n",
            &DatasetKey::Financial.hints(),
            &TimezoneHandler::default(),
        )
        .unwrap();
        let mut datasets = Datasets::new();
        datasets.insert(DatasetKey::Financial, records);
        let report = assemble(&spec, &datasets, None, None).unwrap();
        assert!(report.range.is_none());
        assert_eq!(report.record_count, 0);
    }
}

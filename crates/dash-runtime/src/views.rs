//! Declarative catalogue of the dashboard views.
//!
//! Each [`ViewSpec`] names the extracts a view reads, how their columns are
//! typed, which metrics and charts it shows and which columns its table
//! lists by default. The assembler interprets these specs; nothing here
//! computes anything.

use std::fmt;
use std::str::FromStr;

use dash_core::error::DashError;
use dash_core::models::{Condition, MetricFormat, Period, Value};
use dash_data::aggregator::{Aggregation, MetricSpec, PeriodValue};
use dash_data::loader::SchemaHints;
use serde::Serialize;

// ── ViewKind ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Revenue,
    Customers,
    Subscriptions,
    Payment,
    Financial,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Revenue,
        ViewKind::Customers,
        ViewKind::Subscriptions,
        ViewKind::Payment,
        ViewKind::Financial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Revenue => "revenue",
            ViewKind::Customers => "customers",
            ViewKind::Subscriptions => "subscriptions",
            ViewKind::Payment => "payment",
            ViewKind::Financial => "financial",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Revenue => "Revenue",
            ViewKind::Customers => "Customers",
            ViewKind::Subscriptions => "Subscriptions",
            ViewKind::Payment => "Payment",
            ViewKind::Financial => "Financial",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for ViewKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DashError::Config(format!("unknown view '{}'", s)))
    }
}

// ── Datasets ──────────────────────────────────────────────────────────────────

/// One source extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKey {
    Invoices,
    Customers,
    Subscriptions,
    Payments,
    Financial,
}

impl DatasetKey {
    /// Object name under the data source.
    pub fn object_name(self) -> &'static str {
        match self {
            DatasetKey::Invoices => "Untitled_report.csv",
            DatasetKey::Customers => "customers_6months.csv",
            DatasetKey::Subscriptions => "subscriptions_6months.csv",
            DatasetKey::Payments => "both_success_fail.csv",
            DatasetKey::Financial => "financial.csv",
        }
    }

    /// Column typing for this extract.
    pub fn hints(self) -> SchemaHints {
        match self {
            DatasetKey::Invoices => SchemaHints::new("created").numbers(&[
                "quantity",
                "line_item_amount",
                "total_invoice_amount",
                "discount",
                "fee",
                "tax",
                "net_amount",
            ]),
            DatasetKey::Customers => SchemaHints::new("created").booleans(&["deleted"]),
            DatasetKey::Subscriptions => SchemaHints::new("created")
                .timestamps(&["trial_end", "trial_start", "start_date", "current_period_end"])
                .booleans(&["cancel_at_period_end"]),
            DatasetKey::Payments => SchemaHints::new("created_date")
                .numbers(&["amount", "amount_refunded"])
                .booleans(&["refunded"]),
            DatasetKey::Financial => SchemaHints::new("month").numbers(&[
                "total_sales",
                "total_refunds",
                "total_payouts",
                "net_profit_loss",
            ]),
        }
    }
}

/// Secondary extract joined onto the primary one for the table.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub dataset: DatasetKey,
    pub left_key: &'static str,
    pub right_key: &'static str,
    pub suffix: &'static str,
    /// Timestamp column of the primary extract that selects table rows,
    /// instead of the designated one.
    pub table_timestamp: Option<&'static str>,
}

// ── Charts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
}

/// Post-processing applied to a categorical distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    All,
    Head(usize),
    TopKPlusOther(usize),
    /// Percentages of the whole distribution, then the first `n`.
    PercentHead(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSource {
    Series {
        value: PeriodValue,
        period: Period,
    },
    Distribution {
        field: &'static str,
        /// Optional pre-selection `(field, condition)`.
        filter: Option<(&'static str, Condition)>,
        shape: Shape,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: &'static str,
    pub kind: ChartKind,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub source: ChartSource,
}

impl ChartSpec {
    fn monthly(title: &'static str, kind: ChartKind, y_label: &'static str, value: PeriodValue) -> Self {
        Self {
            title,
            kind,
            x_label: "Month",
            y_label,
            source: ChartSource::Series {
                value,
                period: Period::Month,
            },
        }
    }
}

// ── ViewSpec ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpec {
    pub kind: ViewKind,
    pub dataset: DatasetKey,
    pub join: Option<JoinSpec>,
    pub metrics: Vec<MetricSpec>,
    pub charts: Vec<ChartSpec>,
    pub default_columns: Vec<&'static str>,
}

impl ViewSpec {
    pub fn for_view(kind: ViewKind) -> Self {
        match kind {
            ViewKind::Revenue => revenue(),
            ViewKind::Customers => customers(),
            ViewKind::Subscriptions => subscriptions(),
            ViewKind::Payment => payment(),
            ViewKind::Financial => financial(),
        }
    }

    /// Every extract the view reads, primary first.
    pub fn datasets(&self) -> Vec<DatasetKey> {
        let mut keys = vec![self.dataset];
        if let Some(join) = &self.join {
            keys.push(join.dataset);
        }
        keys
    }
}

fn currency(key: &str, label: &str, field: &str) -> MetricSpec {
    MetricSpec::new(key, label, Aggregation::sum(field), MetricFormat::Currency)
}

fn count(key: &str, label: &str, aggregation: Aggregation) -> MetricSpec {
    MetricSpec::new(key, label, aggregation, MetricFormat::Count)
}

fn text(s: &str) -> Value {
    Value::text(s)
}

fn revenue() -> ViewSpec {
    ViewSpec {
        kind: ViewKind::Revenue,
        dataset: DatasetKey::Invoices,
        join: None,
        metrics: vec![
            currency("total_amount", "Total Amount", "total_invoice_amount"),
            currency("total_tax", "Total Tax", "tax"),
            currency("total_net_amount", "Total Net Amount", "net_amount"),
            currency("total_fee_amount", "Total Fee Amount", "fee"),
            count(
                "total_transactions",
                "Total Transactions",
                Aggregation::count_non_null("total_invoice_amount"),
            ),
            count(
                "subscriptions_sold",
                "Total Subscriptions Sold",
                Aggregation::count_non_null("subscription"),
            ),
        ],
        charts: vec![
            ChartSpec::monthly(
                "Total Net Amount by Month",
                ChartKind::Bar,
                "Net Amount",
                PeriodValue::Sum("net_amount".into()),
            ),
            ChartSpec::monthly(
                "Total Tax by Month",
                ChartKind::Pie,
                "Tax",
                PeriodValue::Sum("tax".into()),
            ),
        ],
        default_columns: vec![
            "created",
            "customer_id",
            "email",
            "phone",
            "name",
            "subscription",
            "invoice_number",
            "description",
            "quantity",
            "currency",
            "line_item_amount",
            "total_invoice_amount",
            "discount",
            "fee",
            "tax",
            "net_amount",
        ],
    }
}

fn customers() -> ViewSpec {
    ViewSpec {
        kind: ViewKind::Customers,
        dataset: DatasetKey::Customers,
        join: None,
        metrics: vec![
            count("total_customers", "Total Customers", Aggregation::Count),
            count("churned_customers", "Churned Customers", Aggregation::sum("deleted")),
            MetricSpec::new(
                "churn_rate",
                "Churn Rate",
                Aggregation::ratio(Aggregation::sum("deleted"), Aggregation::Count),
                MetricFormat::Percent,
            ),
        ],
        charts: vec![ChartSpec::monthly(
            "New Customer Sign-Ups by Month",
            ChartKind::Bar,
            "New Customers Count",
            PeriodValue::Count,
        )],
        default_columns: vec!["created", "email", "phone", "name", "address_country"],
    }
}

fn subscriptions() -> ViewSpec {
    let cancelling = Condition::Equals(Value::Bool(true));
    let not_cancelling = Condition::Equals(Value::Bool(false));
    ViewSpec {
        kind: ViewKind::Subscriptions,
        dataset: DatasetKey::Subscriptions,
        join: Some(JoinSpec {
            dataset: DatasetKey::Customers,
            left_key: "customer_id",
            right_key: "id",
            suffix: "_customer",
            // Upcoming trial ends rather than sign-ups.
            table_timestamp: Some("trial_end"),
        }),
        metrics: vec![
            count(
                "active_subscriptions",
                "Total Active Subscriptions",
                Aggregation::count_where("cancel_at_period_end", not_cancelling),
            ),
            count(
                "cancelling_subscriptions",
                "Cancelling at Period End",
                Aggregation::count_where("cancel_at_period_end", cancelling),
            ),
            count(
                "active_status",
                "Active Status",
                Aggregation::count_where("status", Condition::Equals(text("active"))),
            ),
            count(
                "inactive_status",
                "Inactive Status",
                Aggregation::count_where("status", Condition::NotEquals(text("active"))),
            ),
        ],
        charts: vec![
            ChartSpec {
                title: "Subscription Status Distribution",
                kind: ChartKind::Bar,
                x_label: "Status",
                y_label: "Count",
                source: ChartSource::Distribution {
                    field: "status",
                    filter: None,
                    shape: Shape::All,
                },
            },
            ChartSpec::monthly(
                "Monthly Active Subscriptions",
                ChartKind::Bar,
                "Subscriptions",
                PeriodValue::CountNonNull("customer_id".into()),
            ),
            ChartSpec {
                title: "Daily Active Subscriptions",
                kind: ChartKind::Bar,
                x_label: "Date",
                y_label: "Number of Active Subscriptions",
                source: ChartSource::Series {
                    value: PeriodValue::CountNonNull("customer_id".into()),
                    period: Period::Day,
                },
            },
        ],
        default_columns: vec!["name", "phone", "email", "trial_end"],
    }
}

fn payment() -> ViewSpec {
    ViewSpec {
        kind: ViewKind::Payment,
        dataset: DatasetKey::Payments,
        join: None,
        metrics: vec![
            count("total_transactions", "Total Transactions", Aggregation::Count),
            count(
                "successful_transactions",
                "Successful Transactions",
                Aggregation::count_where("status", Condition::Equals(text("succeeded"))),
            ),
            count(
                "failed_transactions",
                "Failed Transactions",
                Aggregation::count_where("status", Condition::Equals(text("failed"))),
            ),
        ],
        charts: vec![
            ChartSpec {
                title: "Top 2 Refunded Line Items and Others",
                kind: ChartKind::Pie,
                x_label: "Line Item",
                y_label: "Refunds",
                source: ChartSource::Distribution {
                    field: "description",
                    filter: Some(("refunded", Condition::Equals(Value::Bool(true)))),
                    shape: Shape::TopKPlusOther(2),
                },
            },
            ChartSpec {
                title: "Payment Status Distribution",
                kind: ChartKind::Pie,
                x_label: "Status",
                y_label: "Transactions",
                source: ChartSource::Distribution {
                    field: "status",
                    filter: Some((
                        "status",
                        Condition::OneOf(vec![text("succeeded"), text("failed")]),
                    )),
                    shape: Shape::All,
                },
            },
            ChartSpec {
                title: "Top 5 Failure Reasons",
                kind: ChartKind::Bar,
                x_label: "Failure Reason",
                y_label: "Percentage (%)",
                source: ChartSource::Distribution {
                    field: "failure_code",
                    filter: None,
                    shape: Shape::PercentHead(5),
                },
            },
            ChartSpec {
                title: "Most Frequent Refunded Amounts",
                kind: ChartKind::Bar,
                x_label: "Amount Refunded",
                y_label: "Count",
                source: ChartSource::Distribution {
                    field: "amount_refunded",
                    filter: Some(("amount_refunded", Condition::GreaterThan(0.0))),
                    shape: Shape::Head(5),
                },
            },
        ],
        default_columns: vec![
            "id",
            "amount",
            "amount_refunded",
            "balance_transaction_id",
            "calculated_statement_descriptor",
            "created_date",
            "currency",
            "customer_id",
            "description",
            "status",
        ],
    }
}

fn financial() -> ViewSpec {
    ViewSpec {
        kind: ViewKind::Financial,
        dataset: DatasetKey::Financial,
        join: None,
        metrics: vec![
            currency("total_sales", "Total Sales", "total_sales"),
            currency("total_refunds", "Total Refunds", "total_refunds"),
            currency("total_payouts", "Total Payouts", "total_payouts"),
            currency("net_profit_loss", "Net Profit & Loss", "net_profit_loss"),
        ],
        charts: vec![
            ChartSpec::monthly(
                "Total Sales Over Time",
                ChartKind::Bar,
                "Sales",
                PeriodValue::Sum("total_sales".into()),
            ),
            ChartSpec::monthly(
                "Total Refunds Over Time",
                ChartKind::Bar,
                "Refunds",
                PeriodValue::Sum("total_refunds".into()),
            ),
            ChartSpec::monthly(
                "Total Payouts Over Time",
                ChartKind::Bar,
                "Payouts",
                PeriodValue::Sum("total_payouts".into()),
            ),
            ChartSpec::monthly(
                "Net Profit/Loss Over Time",
                ChartKind::Bar,
                "Net Profit/Loss",
                PeriodValue::Sum("net_profit_loss".into()),
            ),
        ],
        default_columns: vec![
            "month",
            "currency",
            "total_sales",
            "total_refunds",
            "total_payouts",
            "net_profit_loss",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_kind_parse_and_cycle() {
        assert_eq!("Payment".parse::<ViewKind>().unwrap(), ViewKind::Payment);
        assert!("ledger".parse::<ViewKind>().is_err());
        assert_eq!(ViewKind::Financial.next(), ViewKind::Revenue);
        assert_eq!(ViewKind::Revenue.prev(), ViewKind::Financial);
        assert_eq!(ViewKind::Subscriptions.index(), 2);
    }

    #[test]
    fn test_every_view_has_metrics_and_columns() {
        for kind in ViewKind::ALL {
            let spec = ViewSpec::for_view(kind);
            assert_eq!(spec.kind, kind);
            assert!(!spec.metrics.is_empty(), "{kind} has no metrics");
            assert!(!spec.charts.is_empty(), "{kind} has no charts");
            assert!(!spec.default_columns.is_empty(), "{kind} has no columns");
        }
    }

    #[test]
    fn test_subscriptions_reads_two_extracts() {
        let spec = ViewSpec::for_view(ViewKind::Subscriptions);
        assert_eq!(
            spec.datasets(),
            vec![DatasetKey::Subscriptions, DatasetKey::Customers]
        );
        assert_eq!(ViewSpec::for_view(ViewKind::Revenue).datasets().len(), 1);
    }

    #[test]
    fn test_dataset_hints_designate_timestamp() {
        assert_eq!(DatasetKey::Payments.hints().timestamp_field, "created_date");
        assert_eq!(DatasetKey::Financial.hints().timestamp_field, "month");
        assert_eq!(DatasetKey::Invoices.object_name(), "Untitled_report.csv");
    }
}

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::dataset::{
    Cell, Dataset, Quarter, COMMISSION, CUSTOMER_NAME, QUANTITY_COLLECTED, QUANTITY_DELIVERED,
    QUARTER, TAILOR_CHARGES,
};

/// A report section computed from the filtered dataset.
///
/// Each section declares the columns it reads; [`compute_section`] skips the
/// section as a unit when any of them is missing.
pub trait Section: Sized {
    const NAME: &'static str;
    const REQUIRED_COLUMNS: &'static [&'static str];

    fn compute(dataset: &Dataset) -> Self;
}

pub fn compute_section<S: Section>(dataset: &Dataset) -> Option<S> {
    if dataset.has_columns(S::REQUIRED_COLUMNS) {
        Some(S::compute(dataset))
    } else {
        debug!(section = S::NAME, required = ?S::REQUIRED_COLUMNS, "missing columns, skipping section");
        None
    }
}

/// A labeled amount for bar and pie presentations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Category {
    pub label: &'static str,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommissionSummary {
    pub commission: f64,
    pub tailor_charges: f64,
    pub net_earnings: f64,
}

impl CommissionSummary {
    pub fn categories(&self) -> [Category; 2] {
        [
            Category {
                label: "Commission",
                amount: self.commission,
            },
            Category {
                label: "Tailor Charges",
                amount: self.tailor_charges,
            },
        ]
    }
}

impl Section for CommissionSummary {
    const NAME: &'static str = "commission vs tailor charges";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[COMMISSION, TAILOR_CHARGES];

    fn compute(dataset: &Dataset) -> Self {
        let commission = dataset.sum(COMMISSION).unwrap_or_default();
        let tailor_charges = dataset.sum(TAILOR_CHARGES).unwrap_or_default();
        Self {
            commission,
            tailor_charges,
            net_earnings: commission - tailor_charges,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarterEarnings {
    pub quarter: Quarter,
    pub commission: f64,
    pub tailor_charges: f64,
    pub net_earnings: f64,
}

/// Net earnings per quarter in chronological order. Quarters without orders
/// are absent rather than zero-filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarterlyNetEarnings {
    pub quarters: Vec<QuarterEarnings>,
}

impl QuarterlyNetEarnings {
    pub fn total_net_earnings(&self) -> f64 {
        self.quarters.iter().map(|q| q.net_earnings).sum()
    }
}

impl Section for QuarterlyNetEarnings {
    const NAME: &'static str = "quarter-over-quarter net earnings";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[QUARTER, COMMISSION, TAILOR_CHARGES];

    fn compute(dataset: &Dataset) -> Self {
        let (Some(q), Some(c), Some(t)) = (
            dataset.column_index(QUARTER),
            dataset.column_index(COMMISSION),
            dataset.column_index(TAILOR_CHARGES),
        ) else {
            return Self::default();
        };
        let groups = dataset
            .rows()
            .iter()
            .filter_map(|r| match r[q] {
                Cell::Quarter(quarter) => Some((quarter, r)),
                _ => None,
            })
            .fold(BTreeMap::new(), |mut groups, (quarter, r)| {
                let (commission, tailor_charges) = groups.entry(quarter).or_insert((0., 0.));
                *commission += r[c].as_f64().unwrap_or_default();
                *tailor_charges += r[t].as_f64().unwrap_or_default();
                groups
            });
        let quarters = groups
            .into_iter()
            .map(|(quarter, (commission, tailor_charges))| QuarterEarnings {
                quarter,
                commission,
                tailor_charges,
                net_earnings: commission - tailor_charges,
            })
            .collect();
        Self { quarters }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InflowOutflow {
    pub collected: f64,
    pub delivered: f64,
}

impl InflowOutflow {
    pub fn categories(&self) -> [Category; 2] {
        [
            Category {
                label: "Collected",
                amount: self.collected,
            },
            Category {
                label: "Delivered",
                amount: self.delivered,
            },
        ]
    }

    /// True when there is nothing to split proportionally.
    pub fn is_degenerate(&self) -> bool {
        self.collected + self.delivered == 0.
    }

    /// Fractions of the total for collected and delivered garments.
    pub fn shares(&self) -> Option<(f64, f64)> {
        if self.is_degenerate() {
            return None;
        }
        let total = self.collected + self.delivered;
        Some((self.collected / total, self.delivered / total))
    }
}

impl Section for InflowOutflow {
    const NAME: &'static str = "inflow vs outflow";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[QUANTITY_COLLECTED, QUANTITY_DELIVERED];

    fn compute(dataset: &Dataset) -> Self {
        Self {
            collected: dataset.sum(QUANTITY_COLLECTED).unwrap_or_default(),
            delivered: dataset.sum(QUANTITY_DELIVERED).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerCount {
    pub customer: String,
    pub order_count: usize,
}

/// Orders per customer, by descending count then ascending name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerRecurrence {
    pub counts: Vec<CustomerCount>,
}

impl CustomerRecurrence {
    /// Customers with more than one order.
    pub fn recurring(&self) -> impl Iterator<Item = &CustomerCount> {
        self.counts.iter().filter(|c| c.order_count > 1)
    }
}

impl Section for CustomerRecurrence {
    const NAME: &'static str = "customer recurrence";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[CUSTOMER_NAME];

    fn compute(dataset: &Dataset) -> Self {
        let mut by_customer: HashMap<String, usize> = HashMap::new();
        for name in dataset
            .column(CUSTOMER_NAME)
            .into_iter()
            .flatten()
            .filter_map(Cell::label)
        {
            *by_customer.entry(name).or_default() += 1;
        }
        let mut counts: Vec<CustomerCount> = by_customer
            .into_iter()
            .map(|(customer, order_count)| CustomerCount {
                customer,
                order_count,
            })
            .collect();
        counts.sort_by(|a, b| {
            b.order_count
                .cmp(&a.order_count)
                .then_with(|| a.customer.cmp(&b.customer))
        });
        Self { counts }
    }
}

/// Every report section for one render pass. Skipped sections are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardReport {
    pub commission: Option<CommissionSummary>,
    pub quarterly: Option<QuarterlyNetEarnings>,
    pub inflow_outflow: Option<InflowOutflow>,
    pub recurrence: Option<CustomerRecurrence>,
}

impl DashboardReport {
    pub fn build(dataset: &Dataset) -> Self {
        Self {
            commission: compute_section(dataset),
            quarterly: compute_section(dataset),
            inflow_outflow: compute_section(dataset),
            recurrence: compute_section(dataset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_customers, CustomerSelection};
    use crate::testing::{headers, num, orders, text};
    use pretty_assertions::assert_eq;

    fn two_customers() -> Dataset {
        Dataset::new(
            headers(&["Customer Name", "Commission", "Tailor Charges"]),
            vec![
                vec![text("A"), num(100.), num(40.)],
                vec![text("B"), num(200.), num(50.)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn net_earnings_for_two_customers() {
        let ds = two_customers();
        let summary = compute_section::<CommissionSummary>(&ds).unwrap();
        assert_eq!(summary.commission, 300.);
        assert_eq!(summary.tailor_charges, 90.);
        assert_eq!(summary.net_earnings, 210.);
        assert_eq!(summary.categories()[1].label, "Tailor Charges");

        let recurrence = compute_section::<CustomerRecurrence>(&ds).unwrap();
        assert_eq!(
            recurrence.counts,
            vec![
                CustomerCount {
                    customer: "A".to_string(),
                    order_count: 1
                },
                CustomerCount {
                    customer: "B".to_string(),
                    order_count: 1
                },
            ]
        );
        assert_eq!(recurrence.recurring().count(), 0);
    }

    #[test]
    fn sections_skip_when_columns_missing() {
        let ds = two_customers();
        let report = DashboardReport::build(&ds);
        assert!(report.commission.is_some());
        assert!(report.recurrence.is_some());
        assert_eq!(report.quarterly, None);
        assert_eq!(report.inflow_outflow, None);

        let bare = Dataset::new(headers(&["Notes"]), vec![vec![text("x")]]).unwrap();
        assert_eq!(DashboardReport::build(&bare), DashboardReport::default());
    }

    #[test]
    fn net_earnings_match_sums_for_every_selection() {
        let ds = orders();
        for selection in [
            CustomerSelection::All,
            CustomerSelection::only(["A"]),
            CustomerSelection::only(["B"]),
            CustomerSelection::none(),
        ] {
            let filtered = filter_customers(&ds, &selection);
            let summary = compute_section::<CommissionSummary>(&filtered).unwrap();
            let expected = filtered.sum(COMMISSION).unwrap() - filtered.sum(TAILOR_CHARGES).unwrap();
            assert_eq!(summary.net_earnings, expected);
        }
    }

    #[test]
    fn quarterly_is_chronological_and_sums_to_overall() {
        let ds = orders();
        let quarterly = compute_section::<QuarterlyNetEarnings>(&ds).unwrap();
        let labels: Vec<String> = quarterly.quarters.iter().map(|q| q.quarter.to_string()).collect();
        assert_eq!(labels, ["2024Q1", "2024Q2"]);
        assert_eq!(quarterly.quarters[0].net_earnings, 210.);
        assert_eq!(quarterly.quarters[1].net_earnings, -10.);

        let overall = compute_section::<CommissionSummary>(&ds).unwrap();
        assert_eq!(quarterly.total_net_earnings(), overall.net_earnings);
    }

    #[test]
    fn quarterly_orders_across_years() {
        let ds = Dataset::new(
            headers(&["Order Date", "Commission", "Tailor Charges"]),
            vec![
                vec![text("2025-01-10"), num(5.), num(1.)],
                vec![text("2023-12-01"), num(7.), num(2.)],
                vec![text("2024-07-15"), num(9.), num(3.)],
                vec![Cell::Empty, num(100.), num(0.)],
            ],
        )
        .unwrap();
        let quarterly = compute_section::<QuarterlyNetEarnings>(&ds).unwrap();
        let labels: Vec<String> = quarterly.quarters.iter().map(|q| q.quarter.to_string()).collect();
        assert_eq!(labels, ["2023Q4", "2024Q3", "2025Q1"]);
    }

    #[test]
    fn inflow_outflow_even_split() {
        let ds = Dataset::new(
            headers(&["Quantity Collected", "Quantity Delivered"]),
            vec![vec![num(5.), num(4.)], vec![num(3.), num(4.)]],
        )
        .unwrap();
        let flow = compute_section::<InflowOutflow>(&ds).unwrap();
        assert_eq!(flow.collected, 8.);
        assert_eq!(flow.delivered, 8.);
        assert!(!flow.is_degenerate());
        assert_eq!(flow.shares(), Some((0.5, 0.5)));
    }

    #[test]
    fn inflow_outflow_degenerate_when_zero() {
        let flow = InflowOutflow::default();
        assert!(flow.is_degenerate());
        assert_eq!(flow.shares(), None);
    }

    #[test]
    fn recurrence_orders_by_count_then_name() {
        let ds = Dataset::new(
            headers(&["Customer Name"]),
            ["Kiran", "Bela", "Kiran", "Anu", "Bela", "Dev", "Kiran"]
                .iter()
                .map(|n| vec![text(n)])
                .chain(std::iter::once(vec![Cell::Empty]))
                .collect(),
        )
        .unwrap();
        let recurrence = compute_section::<CustomerRecurrence>(&ds).unwrap();
        let order: Vec<(&str, usize)> = recurrence
            .counts
            .iter()
            .map(|c| (c.customer.as_str(), c.order_count))
            .collect();
        assert_eq!(order, [("Kiran", 3), ("Bela", 2), ("Anu", 1), ("Dev", 1)]);
        let recurring: Vec<&str> = recurrence.recurring().map(|c| c.customer.as_str()).collect();
        assert_eq!(recurring, ["Kiran", "Bela"]);
    }

    #[test]
    fn empty_selection_gives_zero_results() {
        let ds = filter_customers(&orders(), &CustomerSelection::none());
        let report = DashboardReport::build(&ds);
        assert_eq!(report.commission, Some(CommissionSummary::default()));
        assert_eq!(report.quarterly, Some(QuarterlyNetEarnings::default()));
        assert!(report.inflow_outflow.unwrap().is_degenerate());
        assert_eq!(report.recurrence, Some(CustomerRecurrence::default()));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let ds = orders();
        assert_eq!(DashboardReport::build(&ds), DashboardReport::build(&ds));
    }
}

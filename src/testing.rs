//! Fixture builders shared by the unit tests.

use crate::dataset::{Cell, Dataset};

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

pub fn num(value: f64) -> Cell {
    Cell::Number(value)
}

/// Orders for customers A (x2) and B across two quarters.
pub fn orders() -> Dataset {
    Dataset::new(
        headers(&[
            "Customer Name",
            "Order Date",
            "Commission",
            "Tailor Charges",
            "Quantity Collected",
            "Quantity Delivered",
        ]),
        vec![
            vec![text("A"), text("2024-01-15"), num(100.), num(40.), num(2.), num(1.)],
            vec![text("B"), text("2024-02-20"), num(200.), num(50.), num(3.), num(3.)],
            vec![text("A"), text("2024-04-02"), num(80.), num(90.), num(1.), num(2.)],
        ],
    )
    .unwrap()
}

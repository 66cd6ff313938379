//! Review step: operator edits on a merged record before finalization.
//!
//! The merged record is freely editable. These helpers keep the installment
//! schedule consistent while the operator adds, removes and edits rows, and
//! surface (without blocking) a divergence between the schedule and the
//! contract total. Hard checks happen later in `crate::validation`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Payment, PaymentStatus};
use crate::validation::CENT_TOLERANCE;

#[derive(Error, Debug, PartialEq)]
pub enum ReviewError {
    #[error("Installment {index} does not exist (schedule has {len})")]
    NoSuchInstallment { index: usize, len: usize },
    #[error("Installment count must be at least 1")]
    NoInstallments,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single operator correction to one installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum PaymentEdit {
    DueDate(NaiveDate),
    Value(f64),
    Status(Option<PaymentStatus>),
}

// ---------------------------------------------------------------------------
// Installment schedule
// ---------------------------------------------------------------------------

/// Append an empty installment numbered after the current highest.
pub fn add_payment(payments: &mut Vec<Payment>, due_date: NaiveDate) -> &Payment {
    let number = payments.iter().map(|p| p.number).max().unwrap_or(0) + 1;
    payments.push(Payment {
        number,
        due_date,
        value: 0.0,
        status: None,
    });
    &payments[payments.len() - 1]
}

/// Remove the installment at `index` and renumber the rest 1..N.
pub fn remove_payment(payments: &mut Vec<Payment>, index: usize) -> Result<Payment, ReviewError> {
    if index >= payments.len() {
        return Err(ReviewError::NoSuchInstallment {
            index,
            len: payments.len(),
        });
    }
    let removed = payments.remove(index);
    renumber(payments);
    Ok(removed)
}

pub fn update_payment(
    payments: &mut [Payment],
    index: usize,
    edit: PaymentEdit,
) -> Result<(), ReviewError> {
    let len = payments.len();
    let payment = payments
        .get_mut(index)
        .ok_or(ReviewError::NoSuchInstallment { index, len })?;

    match edit {
        PaymentEdit::DueDate(date) => payment.due_date = date,
        PaymentEdit::Value(value) => payment.value = value,
        PaymentEdit::Status(status) => payment.status = status,
    }
    Ok(())
}

/// Number installments 1..N in their current order.
pub fn renumber(payments: &mut [Payment]) {
    for (i, payment) in payments.iter_mut().enumerate() {
        payment.number = i as u32 + 1;
    }
}

/// Warning text when the schedule does not add up to a positive total.
pub fn installment_divergence(total: f64, payments: &[Payment]) -> Option<String> {
    let sum: f64 = payments.iter().map(|p| p.value).sum();
    if total > 0.0 && (sum - total).abs() > CENT_TOLERANCE {
        Some(format!(
            "Soma das parcelas (R$ {sum:.2}) difere do total (R$ {total:.2})"
        ))
    } else {
        None
    }
}

/// Split `total` into `n` cent-rounded installments. The last one absorbs
/// the rounding remainder so the values always sum to `total`.
pub fn distribute_payments(total: f64, n: usize) -> Result<Vec<f64>, ReviewError> {
    if n == 0 {
        return Err(ReviewError::NoInstallments);
    }
    let base = round_cents(total / n as f64);
    let mut values = vec![base; n];
    let head: f64 = values[..n - 1].iter().sum();
    values[n - 1] = round_cents(total - head);
    Ok(values)
}

pub fn calculate_total_value(area_hectares: f64, price_per_hectare: f64) -> f64 {
    round_cents(area_hectares * price_per_hectare)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn make_schedule(values: &[f64]) -> Vec<Payment> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Payment {
                number: i as u32 + 1,
                due_date: date(i as u32 + 1, 10),
                value: *v,
                status: None,
            })
            .collect()
    }

    #[test]
    fn add_numbers_after_highest() {
        let mut payments = make_schedule(&[100.0, 100.0]);
        payments[1].number = 7;
        let added = add_payment(&mut payments, date(9, 1));
        assert_eq!(added.number, 8);
        assert_eq!(added.value, 0.0);
    }

    #[test]
    fn add_to_empty_starts_at_one() {
        let mut payments = Vec::new();
        assert_eq!(add_payment(&mut payments, date(1, 1)).number, 1);
    }

    #[test]
    fn remove_renumbers_contiguously() {
        let mut payments = make_schedule(&[1.0, 2.0, 3.0, 4.0]);
        let removed = remove_payment(&mut payments, 1).unwrap();
        assert_eq!(removed.value, 2.0);
        let numbers: Vec<u32> = payments.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(payments[1].value, 3.0);
    }

    #[test]
    fn remove_out_of_range() {
        let mut payments = make_schedule(&[1.0]);
        assert_eq!(
            remove_payment(&mut payments, 3),
            Err(ReviewError::NoSuchInstallment { index: 3, len: 1 })
        );
    }

    #[test]
    fn update_applies_single_field() {
        let mut payments = make_schedule(&[100.0]);
        update_payment(&mut payments, 0, PaymentEdit::Value(250.5)).unwrap();
        update_payment(&mut payments, 0, PaymentEdit::Status(Some(PaymentStatus::Paid))).unwrap();
        assert_eq!(payments[0].value, 250.5);
        assert_eq!(payments[0].status, Some(PaymentStatus::Paid));
        assert_eq!(payments[0].due_date, date(1, 10));
        assert!(update_payment(&mut payments, 1, PaymentEdit::DueDate(date(2, 2))).is_err());
    }

    #[test]
    fn edit_deserializes_from_tagged_json() {
        let edit: PaymentEdit =
            serde_json::from_str(r#"{"field":"dueDate","value":"2025-06-30"}"#).unwrap();
        assert_eq!(edit, PaymentEdit::DueDate(date(6, 30)));
    }

    #[test]
    fn divergence_reported_with_both_amounts() {
        let payments = make_schedule(&[1000.0, 1000.0]);
        assert_eq!(
            installment_divergence(2500.0, &payments).as_deref(),
            Some("Soma das parcelas (R$ 2000.00) difere do total (R$ 2500.00)")
        );
        assert!(installment_divergence(2000.005, &payments).is_none());
        assert!(installment_divergence(0.0, &payments).is_none());
    }

    #[test]
    fn distribute_last_absorbs_rounding() {
        let values = distribute_payments(100.0, 3).unwrap();
        assert_eq!(values, vec![33.33, 33.33, 33.34]);
        assert!((values.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert_eq!(distribute_payments(100.0, 0), Err(ReviewError::NoInstallments));
    }

    #[test]
    fn total_from_area_and_price() {
        assert_eq!(calculate_total_value(150.5, 120.0), 18060.0);
        assert_eq!(calculate_total_value(0.0, 120.0), 0.0);
    }
}

// Billing: settlement of a completed shift

use super::account::UserId;
use super::error::{DomainError, Result};
use super::shift::{HotelId, Shift, ShiftId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billing ID (UUID v4)
pub type BillingId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    Pending,
    Paid,
}

impl std::fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingStatus::Pending => write!(f, "PENDING"),
            BillingStatus::Paid => write!(f, "PAID"),
        }
    }
}

impl std::str::FromStr for BillingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BillingStatus::Pending),
            "PAID" => Ok(BillingStatus::Paid),
            other => Err(format!("unknown billing status: {}", other)),
        }
    }
}

/// Settlement record, one per completed shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    pub id: BillingId,
    pub shift_id: ShiftId,
    pub hotel_id: HotelId,
    pub status: BillingStatus,
    pub duration_hours: f64,
    pub gross: f64,
    pub platform_share: f64,
    pub contractor_share: f64,
    pub payment_reference: Option<String>,
    /// Actor whose clock-out produced the bill
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Result of splitting gross pay between platform and contractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingSplit {
    pub duration_hours: f64,
    pub gross: f64,
    pub platform_share: f64,
    pub contractor_share: f64,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Pure billing computation
#[derive(Debug, Clone, Copy)]
pub struct BillingCalculator {
    /// Percent (0..=100)
    platform_percentage: f64,
}

impl BillingCalculator {
    pub fn new(platform_percentage: f64) -> Self {
        Self {
            platform_percentage,
        }
    }

    pub fn platform_percentage(&self) -> f64 {
        self.platform_percentage
    }

    /// Split pay for a worked interval.
    ///
    /// Hours are rounded to two decimals before multiplying, the platform
    /// share is rounded to cents and the contractor receives the remainder,
    /// so the two shares always add up to the gross.
    pub fn split(
        &self,
        pay_rate: f64,
        clock_in: DateTime<Utc>,
        clock_out: DateTime<Utc>,
    ) -> Result<BillingSplit> {
        let seconds = (clock_out - clock_in).num_milliseconds() as f64 / 1000.0;
        if seconds <= 0.0 {
            return Err(DomainError::ValidationError(format!(
                "billable duration must be positive, clock-in {} clock-out {}",
                clock_in, clock_out
            )));
        }

        let duration_hours = round_to(seconds / 3600.0, 2);
        if duration_hours <= 0.0 {
            return Err(DomainError::ValidationError(format!(
                "billable duration of {}s rounds to zero hours",
                seconds
            )));
        }
        let gross = pay_rate * duration_hours;
        let platform_share = round_to(gross * self.platform_percentage / 100.0, 2);
        let contractor_share = gross - platform_share;

        Ok(BillingSplit {
            duration_hours,
            gross,
            platform_share,
            contractor_share,
        })
    }

    /// Bill a shift that has just been clocked out.
    ///
    /// Time before the scheduled start is not billed: the billable interval
    /// runs from `max(actual_clock_in, scheduled_start)` to the (already
    /// capped) clock-out.
    pub fn bill(
        &self,
        shift: &Shift,
        id: impl Into<String>,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Billing> {
        let (Some(clock_in), Some(clock_out)) = (shift.actual_clock_in, shift.actual_clock_out)
        else {
            return Err(DomainError::NotStarted(shift.id.clone()));
        };
        let billable_from = clock_in.max(shift.scheduled_start);
        let split = self.split(shift.pay_rate, billable_from, clock_out)?;

        Ok(Billing {
            id: id.into(),
            shift_id: shift.id.clone(),
            hotel_id: shift.hotel_id.clone(),
            status: BillingStatus::Pending,
            duration_hours: split.duration_hours,
            gross: split.gross,
            platform_share: split.platform_share,
            contractor_share: split.contractor_share,
            payment_reference: None,
            created_by: created_by.into(),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shift::{AudienceMode, NewShift};
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_split_four_hours() {
        let calc = BillingCalculator::new(45.0);
        let split = calc.split(100.0, at(9, 0), at(13, 0)).unwrap();

        assert_eq!(split.duration_hours, 4.0);
        assert_eq!(split.gross, 400.0);
        assert_eq!(split.platform_share, 180.0);
        assert_eq!(split.contractor_share, 220.0);
    }

    #[test]
    fn test_split_rounds_hours_to_two_decimals() {
        let calc = BillingCalculator::new(45.0);
        // 1h 20m = 1.3333h -> 1.33h
        let split = calc.split(30.0, at(9, 0), at(10, 20)).unwrap();

        assert_eq!(split.duration_hours, 1.33);
        assert!((split.gross - 39.9).abs() < 1e-9);
        assert!((split.platform_share + split.contractor_share - split.gross).abs() < 0.01);
    }

    #[test]
    fn test_shares_always_sum_to_gross() {
        let calc = BillingCalculator::new(45.0);
        for minutes in [1_i64, 7, 59, 61, 133, 479] {
            for rate in [9.99, 17.5, 33.33] {
                let split = calc
                    .split(rate, at(9, 0), at(9, 0) + Duration::minutes(minutes))
                    .unwrap();
                let expected = rate * split.duration_hours;
                assert!(
                    (split.platform_share + split.contractor_share - expected).abs() < 0.01,
                    "minutes={} rate={}",
                    minutes,
                    rate
                );
            }
        }
    }

    #[test]
    fn test_zero_duration_rejected() {
        let calc = BillingCalculator::new(45.0);
        assert!(calc.split(100.0, at(9, 0), at(9, 0)).is_err());
        assert!(calc.split(100.0, at(10, 0), at(9, 0)).is_err());
    }

    #[test]
    fn test_duration_rounding_to_zero_rejected() {
        let calc = BillingCalculator::new(45.0);
        // 10s = 0.0028h -> 0.00h
        assert!(calc.split(100.0, at(9, 0), at(9, 0) + Duration::seconds(10)).is_err());
        // 36s = 0.01h
        let split = calc.split(100.0, at(9, 0), at(9, 0) + Duration::seconds(36)).unwrap();
        assert_eq!(split.duration_hours, 0.01);
    }

    #[test]
    fn test_bill_ignores_time_before_scheduled_start() {
        let mut shift = Shift::new(
            "shift-1",
            "manager-1",
            at(6, 0),
            NewShift {
                name: "Breakfast service".to_string(),
                hotel_id: "hotel-1".to_string(),
                pay_rate: 100.0,
                scheduled_start: at(9, 0),
                scheduled_end: at(13, 0),
                audience: AudienceMode::Market,
                target_audience: None,
                contractor_id: None,
            },
        );
        shift.actual_clock_in = Some(at(8, 50));
        shift.actual_clock_out = Some(at(13, 0));

        let bill = BillingCalculator::new(45.0)
            .bill(&shift, "bill-1", "contractor-a", at(13, 10))
            .unwrap();

        assert_eq!(bill.gross, 400.0);
        assert_eq!(bill.platform_share, 180.0);
        assert_eq!(bill.contractor_share, 220.0);
        assert_eq!(bill.status, BillingStatus::Pending);
        assert_eq!(bill.hotel_id, "hotel-1");
    }
}

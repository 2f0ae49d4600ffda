//! Type-safe price representation using decimal arithmetic.
//!
//! The storefront prices its whole catalog in a single currency, so the
//! arithmetic helpers keep the left-hand operand's currency and never
//! convert between currencies.

use core::fmt;
use core::ops::{Add, AddAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places money is rounded to.
const MONEY_SCALE: u32 = 2;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Create a price from a whole number of standard units.
    #[must_use]
    pub fn whole(units: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::from(units), currency_code)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// This price scaled by `rate` (e.g. `0.18` for 18%), rounded to money scale.
    #[must_use]
    pub fn scaled(self, rate: Decimal) -> Self {
        Self::new(self.amount * rate, self.currency_code).rounded()
    }

    /// Subtract `other`, clamping at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        let amount = (self.amount - other.amount).max(Decimal::ZERO);
        Self::new(amount, self.currency_code)
    }

    /// The smaller of the two amounts.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if other.amount < self.amount {
            Self::new(other.amount, self.currency_code)
        } else {
            self
        }
    }

    /// Round half-up to two decimal places.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(
            self.amount
                .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero),
            self.currency_code,
        )
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Sum an iterator of prices, starting from zero in `currency_code`.
    pub fn sum<I>(prices: I, currency_code: CurrencyCode) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        prices
            .into_iter()
            .fold(Self::zero(currency_code), |acc, price| acc + price)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.amount += rhs.amount;
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inr(units: i64) -> Price {
        Price::whole(units, CurrencyCode::INR)
    }

    #[test]
    fn test_times_and_sum() {
        let total = Price::sum([inr(200).times(2), inr(300).times(1)], CurrencyCode::INR);
        assert_eq!(total, inr(700));
    }

    #[test]
    fn test_scaled_rounds_to_paise() {
        let price = Price::new(Decimal::new(33333, 2), CurrencyCode::INR); // 333.33
        let tax = price.scaled(Decimal::new(18, 2));
        assert_eq!(tax.amount, Decimal::new(6000, 2)); // 59.9994 -> 60.00
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        assert_eq!(inr(50).saturating_sub(inr(100)), inr(0));
        assert_eq!(inr(150).saturating_sub(inr(100)), inr(50));
    }

    #[test]
    fn test_min() {
        assert_eq!(inr(100).min(inr(40)), inr(40));
        assert_eq!(inr(10).min(inr(40)), inr(10));
    }

    #[test]
    fn test_display() {
        assert_eq!(inr(700).to_string(), "₹700.00");
        assert_eq!(
            Price::new(Decimal::new(1999, 2), CurrencyCode::USD).to_string(),
            "$19.99"
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!(" GBP ".parse::<CurrencyCode>().unwrap(), CurrencyCode::GBP);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_serde_amount_as_string() {
        let json = serde_json::to_value(inr(49)).unwrap();
        assert_eq!(json["amount"], "49");
        assert_eq!(json["currency_code"], "INR");
    }
}

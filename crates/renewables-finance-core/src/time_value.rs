use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::RenewablesFinanceError;
use crate::types::{Money, Rate};
use crate::RenewablesFinanceResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.000001);
const MAX_IRR_ITERATIONS: u32 = 1000;
/// Below this the Newton step is considered numerically meaningless.
const DERIVATIVE_FLOOR: Decimal = dec!(0.000000000000000001);
const MIN_IRR: Rate = dec!(-0.99);
const MAX_IRR: Rate = dec!(5.0);

/// Initial Newton-Raphson guess (10% per period).
pub const DEFAULT_IRR_GUESS: Rate = dec!(0.10);

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> RenewablesFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(RenewablesFinanceError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                // Remaining terms are below Decimal resolution
                None => break,
            }
        }
        if discount.is_zero() {
            return Err(RenewablesFinanceError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// True when the series has at least one strictly negative and one strictly
/// positive flow, the precondition for an IRR to exist.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    cash_flows.iter().any(|cf| *cf < Decimal::ZERO)
        && cash_flows.iter().any(|cf| *cf > Decimal::ZERO)
}

/// NPV and its first derivative with respect to the rate.
///
/// Returns `None` when the discounting leaves the representable range
/// (discount factor collapses to zero or a division overflows).
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                None => break,
            }
        }
        if discount.is_zero() {
            return None;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let next = match discount.checked_mul(one_plus_r) {
                Some(d) => d,
                None => break,
            };
            let t_dec = Decimal::from(t as i64);
            dnpv = dnpv.checked_sub(t_dec.checked_mul(*cf)?.checked_div(next)?)?;
        }
    }

    Some((npv_val, dnpv))
}

/// Periodic Internal Rate of Return using Newton-Raphson.
///
/// Iterates `rate -= NPV / NPV'` from `guess` for up to 1000 iterations or
/// until `|NPV| < 1e-6`. Fails with `ConvergenceFailure` if the derivative
/// vanishes, the discounting overflows, or the candidate leaves
/// `[-0.99, 5.0]`.
pub fn irr(cash_flows: &[Money], guess: Rate) -> RenewablesFinanceResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(RenewablesFinanceError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if !has_sign_change(cash_flows) {
        return Err(RenewablesFinanceError::InsufficientData(
            "IRR requires at least one negative and one positive cash flow".into(),
        ));
    }

    let mut rate = guess;
    let mut last_delta = Decimal::ZERO;

    for i in 0..MAX_IRR_ITERATIONS {
        let failure = |last_delta| RenewablesFinanceError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: i,
            last_delta,
        };

        let (npv_val, dnpv) = npv_and_derivative(rate, cash_flows).ok_or(failure(last_delta))?;
        last_delta = npv_val;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        if dnpv.abs() < DERIVATIVE_FLOOR {
            return Err(failure(npv_val));
        }

        rate -= npv_val.checked_div(dnpv).ok_or(failure(npv_val))?;

        if rate < MIN_IRR || rate > MAX_IRR {
            return Err(failure(npv_val));
        }
    }

    Err(RenewablesFinanceError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta,
    })
}

/// Convert a periodic rate into an effective annual rate:
/// `(1 + r)^periods_per_year - 1`.
pub fn annualize(periodic_rate: Rate, periods_per_year: u32) -> Option<Rate> {
    if periods_per_year == 1 {
        return Some(periodic_rate);
    }
    (Decimal::ONE + periodic_rate)
        .checked_powi(periods_per_year as i64)
        .map(|growth| growth - Decimal::ONE)
}

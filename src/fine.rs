use crate::models::Fine;

/// Currency units charged per percentage point of shortfall.
pub const DEFAULT_FINE_RATE: u32 = 400;

/// Returns `None` when attendance meets or exceeds the target.
pub fn calculate_fine(current_attendance: f64, target_attendance: f64, fine_rate: u32) -> Option<Fine> {
    if current_attendance >= target_attendance {
        return None;
    }

    let shortfall = round_one_decimal(target_attendance - current_attendance);
    let amount = (shortfall * fine_rate as f64).round() as u64;

    Some(Fine { amount, shortfall })
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.1}%")
}

/// Rupee amount with Indian digit grouping, e.g. `₹12,34,567`.
pub fn format_fine_amount(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("₹{},{}", groups.join(","), tail)
}

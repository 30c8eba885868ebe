use crate::error::TabmergeResult;
use std::{fmt::Display, sync::Once};

pub type Result<T> = TabmergeResult<T>;

#[allow(unused)]
static INIT_LOG: Once = Once::new();

#[allow(unused)]
pub fn init_logger() {
    INIT_LOG.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Trace)
            .is_test(true)
            .init();
    });
}

pub fn handle_error_and_exit(err: impl Display) -> ! {
    log::error!("{err}");
    std::process::exit(1);
}

pub fn format_number_with_commas<T: Display>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = s.strip_prefix('-').map_or(("", s.as_str()), |d| ("-", d));

    if digits.len() <= 3 {
        return s;
    }

    let mut result = String::with_capacity(digits.len() + (digits.len() - 1) / 3 + sign.len());
    for (digit_count, c) in digits.chars().rev().enumerate() {
        if digit_count > 0 && digit_count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result = result.chars().rev().collect();
    if !sign.is_empty() {
        result.insert_str(0, sign);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_with_commas() {
        assert_eq!(format_number_with_commas(0u64), "0");
        assert_eq!(format_number_with_commas(999usize), "999");
        assert_eq!(format_number_with_commas(52_000usize), "52,000");
        assert_eq!(format_number_with_commas(-1_000_000i64), "-1,000,000");
        assert_eq!(
            format_number_with_commas(u64::MAX),
            "18,446,744,073,709,551,615"
        );
    }
}

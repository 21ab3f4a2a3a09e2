//! Column name heuristics for staging exports
//!
//! Names are compared case-insensitively against fixed analog lists.
//! Voucher and batch identifiers, and the columns the import process always
//! expects, are added to an export without the user picking them.

const LINE_NUMBER_ANALOGS: &[&str] = &[
    "line number",
    "linenumber",
    "line num",
    "linenum",
    "line no",
    "lineno",
    "line#",
    "line #",
];

const FORBIDDEN_COLUMN_NAMES: &[&str] = &["company", "companyno"];

const VOUCHER_ANALOGS: &[&str] = &[
    "vouchernumber",
    "voucherno",
    "vouchernum",
    "voucher number",
    "voucher no",
    "voucher num",
    "voucher",
];

const BATCH_ANALOGS: &[&str] = &[
    "batchnumber",
    "batchno",
    "batchnum",
    "batchid",
    "batch",
    "batchn umber",
    "batch no",
    "batch num",
    "batch id",
];

fn matches_any(text: &str, analogs: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    analogs.contains(&lowered.as_str())
}

pub fn is_line_number(text: &str) -> bool {
    matches_any(text, LINE_NUMBER_ANALOGS)
}

pub fn is_forbidden_column_name(text: &str) -> bool {
    matches_any(text, FORBIDDEN_COLUMN_NAMES)
}

pub fn is_voucher_analog(text: &str) -> bool {
    matches_any(text, VOUCHER_ANALOGS)
}

pub fn is_batch_analog(text: &str) -> bool {
    matches_any(text, BATCH_ANALOGS)
}

/// Whether a column is added to every export automatically
///
/// Line-number analogs are recognised but not auto-included.
pub fn is_auto_included(text: &str) -> bool {
    is_forbidden_column_name(text) || is_voucher_analog(text) || is_batch_analog(text)
}

/// Auto-included names from `names`, in input order
pub fn auto_included<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    names.into_iter().filter(|name| is_auto_included(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analogs_ignore_case() {
        assert!(is_voucher_analog("Voucher No"));
        assert!(is_batch_analog("BATCHID"));
        assert!(is_forbidden_column_name("CompanyNo"));
        assert!(is_line_number("Line #"));
        assert!(!is_voucher_analog("Voucher Date"));
    }

    #[test]
    fn test_line_numbers_are_not_auto_included() {
        assert!(!is_auto_included("LineNumber"));
        assert!(is_auto_included("Batch Num"));
    }

    #[test]
    fn test_auto_included_keeps_order() {
        let names = ["InvoiceNo", "Company", "VoucherNo", "AmountDue", "BatchId"];
        assert_eq!(auto_included(names), vec!["Company", "VoucherNo", "BatchId"]);
    }
}

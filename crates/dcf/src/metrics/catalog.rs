//! Catalog of the financial-statement line items the pipeline reads.
//!
//! Vendors label the same line item differently across tickers and filing
//! years, so each metric carries an ordered list of accepted labels. The
//! first label present in the statement wins.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Financial statement a metric is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    /// Income statement
    Income,
    /// Balance sheet
    Balance,
    /// Cash-flow statement
    CashFlow,
}

/// A named financial-statement metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Earnings before interest and taxes
    Ebit,
    /// Earnings before interest, taxes, depreciation and amortization
    Ebitda,
    /// Income tax provision
    TaxProvision,
    /// Net income
    NetIncome,
    /// Income before taxes
    PretaxIncome,
    /// Interest expense
    InterestExpense,
    /// Total assets
    TotalAssets,
    /// Total equity including minority interest
    TotalEquity,
    /// Total liabilities net of minority interest
    TotalLiabilities,
    /// Total financial debt
    TotalDebt,
    /// Current assets
    CurrentAssets,
    /// Current liabilities
    CurrentLiabilities,
    /// Non-current liabilities
    NonCurrentLiabilities,
    /// Cash and cash equivalents
    CashAndEquivalents,
    /// Invested capital
    InvestedCapital,
    /// Capital expenditure (absolute value)
    CapitalExpenditure,
    /// Cash flow from operations
    OperatingCashFlow,
    /// Repayment of debt (negative cash effect)
    RepaymentOfDebt,
    /// Issuance of debt (positive cash effect)
    IssuanceOfDebt,
}

impl Metric {
    /// Every metric in the catalog.
    pub const ALL: [Self; 19] = [
        Self::Ebit,
        Self::Ebitda,
        Self::TaxProvision,
        Self::NetIncome,
        Self::PretaxIncome,
        Self::InterestExpense,
        Self::TotalAssets,
        Self::TotalEquity,
        Self::TotalLiabilities,
        Self::TotalDebt,
        Self::CurrentAssets,
        Self::CurrentLiabilities,
        Self::NonCurrentLiabilities,
        Self::CashAndEquivalents,
        Self::InvestedCapital,
        Self::CapitalExpenditure,
        Self::OperatingCashFlow,
        Self::RepaymentOfDebt,
        Self::IssuanceOfDebt,
    ];

    /// Snake-case identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ebit => "ebit",
            Self::Ebitda => "ebitda",
            Self::TaxProvision => "tax_provision",
            Self::NetIncome => "net_income",
            Self::PretaxIncome => "pretax_income",
            Self::InterestExpense => "interest_expense",
            Self::TotalAssets => "total_assets",
            Self::TotalEquity => "total_equity",
            Self::TotalLiabilities => "total_liabilities_net_minority_interest",
            Self::TotalDebt => "total_debt",
            Self::CurrentAssets => "current_assets",
            Self::CurrentLiabilities => "current_liabilities",
            Self::NonCurrentLiabilities => "non_current_liabilities",
            Self::CashAndEquivalents => "cash_and_equivalents",
            Self::InvestedCapital => "invested_capital",
            Self::CapitalExpenditure => "capital_expenditure",
            Self::OperatingCashFlow => "operating_cash_flow",
            Self::RepaymentOfDebt => "repayment_of_debt",
            Self::IssuanceOfDebt => "issuance_of_debt",
        }
    }

    /// Statement the metric is reported on.
    pub const fn statement(self) -> Statement {
        match self {
            Self::Ebit
            | Self::Ebitda
            | Self::TaxProvision
            | Self::NetIncome
            | Self::PretaxIncome
            | Self::InterestExpense => Statement::Income,
            Self::TotalAssets
            | Self::TotalEquity
            | Self::TotalLiabilities
            | Self::TotalDebt
            | Self::CurrentAssets
            | Self::CurrentLiabilities
            | Self::NonCurrentLiabilities
            | Self::CashAndEquivalents
            | Self::InvestedCapital => Statement::Balance,
            Self::CapitalExpenditure
            | Self::OperatingCashFlow
            | Self::RepaymentOfDebt
            | Self::IssuanceOfDebt => Statement::CashFlow,
        }
    }

    /// Accepted vendor labels, in order of preference.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Ebit => &["EBIT", "Operating Income"],
            Self::Ebitda => &["EBITDA", "Normalized EBITDA"],
            Self::TaxProvision => &["Tax Provision", "Income Tax Expense"],
            Self::NetIncome => &["Net Income", "Net Income Common Stockholders"],
            Self::PretaxIncome => &["Pretax Income"],
            Self::InterestExpense => &["Interest Expense", "Interest Expense Non Operating"],
            Self::TotalAssets => &["Total Assets"],
            Self::TotalEquity => &["Total Equity Gross Minority Interest", "Stockholders Equity"],
            Self::TotalLiabilities => &["Total Liabilities Net Minority Interest"],
            Self::TotalDebt => &["Total Debt"],
            Self::CurrentAssets => &[
                "Total Current Assets",
                "Current Assets",
                "Total Current Assets Gross",
            ],
            Self::CurrentLiabilities => &[
                "Total Current Liabilities",
                "Current Liabilities",
                "Total Current Liabilities Net",
            ],
            Self::NonCurrentLiabilities => &[
                "Total Non Current Liabilities Net Minority Interest",
                "Total Non Current Liabilities",
            ],
            Self::CashAndEquivalents => &[
                "Cash And Cash Equivalents",
                "Cash And Short Term Investments",
                "Cash & Equivalents",
            ],
            Self::InvestedCapital => &["Invested Capital"],
            Self::CapitalExpenditure => &["Capital Expenditure", "Capital Expenditures", "CapEx"],
            Self::OperatingCashFlow => &[
                "Operating Cash Flow",
                "Cash Flow From Continuing Operating Activities",
            ],
            Self::RepaymentOfDebt => &["Repayment Of Debt"],
            Self::IssuanceOfDebt => &["Issuance Of Debt"],
        }
    }

    /// Whether extraction fails when no alias resolves.
    ///
    /// Optional metrics have a documented substitute downstream.
    pub const fn is_required(self) -> bool {
        !matches!(
            self,
            Self::PretaxIncome
                | Self::InterestExpense
                | Self::TotalDebt
                | Self::NonCurrentLiabilities
                | Self::InvestedCapital
        )
    }

    /// Whether a reported null means "no such cash flow this period".
    pub const fn null_is_zero(self) -> bool {
        matches!(self, Self::RepaymentOfDebt | Self::IssuanceOfDebt)
    }

    /// Whether the stored value is the magnitude of the reported figure.
    pub const fn stored_as_magnitude(self) -> bool {
        matches!(self, Self::CapitalExpenditure)
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported statement issuers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bank {
    Itau,
    MercadoPago,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::Itau, Bank::MercadoPago];

    /// Lowercase token looked for in statement file names.
    pub fn key(self) -> &'static str {
        match self {
            Bank::Itau => "itau",
            Bank::MercadoPago => "mercadopago",
        }
    }

    pub fn account(self) -> BankAccount {
        let (bank_name, agency, account, bank_id, org, fid) = match self {
            Bank::Itau => ("Itaú", "7431", "052607-3", "0260", "ITAÚ UNIBANCO S.A.", "260"),
            Bank::MercadoPago => (
                "Mercado Pago",
                "1",
                "74645773646",
                "323",
                "MERCADO PAGO INSTITUIÇÃO DE PAGAMENTO LTDA.",
                "323",
            ),
        };
        BankAccount {
            bank_name: bank_name.to_string(),
            agency: agency.to_string(),
            account: account.to_string(),
            bank_id: bank_id.to_string(),
            org: org.to_string(),
            fid: fid.to_string(),
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Account block written into `BANKACCTFROM` and the sign-on `FI` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: String,
    pub agency: String,
    pub account: String,
    pub bank_id: String,
    pub org: String,
    pub fid: String,
}

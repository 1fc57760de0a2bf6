use std::collections::HashMap;

/// Tokens shorter than this carry too little signal to compare on.
const MIN_SIGNIFICANT_LEN: usize = 4;

/// Built-in aliases: canonical vendor name (as it appears on the ledger
/// side) mapped to strings that commonly show up on bank statements for
/// the same counterparty.
const BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    ("amazon web services", &["aws", "amazon"]),
    ("amazon", &["amzn"]),
    ("google cloud platform", &["gcp", "google cloud", "google"]),
    ("google workspace", &["gsuite", "google"]),
    ("microsoft azure", &["azure", "msft"]),
    ("microsoft", &["msft"]),
    ("adobe systems", &["adobe", "adbe"]),
    ("intuit quickbooks", &["intuit", "qbooks"]),
    ("salesforce", &["sfdc"]),
    ("github", &["gh"]),
    ("digitalocean", &["digital ocean"]),
    ("pg&e", &["pge", "pg&e", "pacific gas"]),
    ("pacific gas and electric", &["pge", "pg&e", "pacific gas"]),
    ("at&t", &["att"]),
    ("t-mobile", &["tmobile", "t mobile"]),
    ("verizon wireless", &["verizon", "vzw"]),
    ("comcast", &["xfinity"]),
    ("united parcel service", &["ups"]),
    ("federal express", &["fedex"]),
    ("united states postal service", &["usps", "postal service"]),
    ("paypal", &["pypl"]),
    ("square", &["sq ", "block inc"]),
    ("stripe", &["stripe payments"]),
    ("uber technologies", &["uber"]),
    ("lyft inc", &["lyft"]),
    ("walmart", &["wal-mart", "wmt"]),
    ("costco wholesale", &["costco"]),
    ("home depot", &["homedepot", "home depot inc"]),
    ("southwest airlines", &["southwest", "swa"]),
    ("delta air lines", &["delta", "dal"]),
    ("mcdonald's", &["mcdonalds", "mcd"]),
    ("starbucks", &["sbux"]),
];

/// Decides whether two free-text descriptions plausibly name the same
/// counterparty. Stateless apart from the alias data; all checks are
/// case-insensitive and ordered cheapest / highest-precision first.
pub struct VendorAliasTable {
    aliases: HashMap<String, Vec<String>>,
}

impl Default for VendorAliasTable {
    fn default() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(vendor, names)| {
                (
                    vendor.to_string(),
                    names.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        Self { aliases }
    }
}

impl VendorAliasTable {
    pub fn new(aliases: HashMap<String, Vec<String>>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(vendor, names)| {
                (
                    vendor.to_lowercase(),
                    names.into_iter().map(|n| n.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { aliases }
    }

    /// Loads an alias table from TOML of the form
    /// `"vendor name" = ["alias", "alias"]`, one entry per vendor.
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        let aliases: HashMap<String, Vec<String>> =
            toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))?;
        Ok(Self::new(aliases))
    }

    pub fn lookup(&self, vendor: &str) -> Option<&[String]> {
        self.aliases.get(vendor).map(Vec::as_slice)
    }

    /// True when the bank-side and ledger-side descriptions plausibly refer
    /// to the same counterparty. Short-circuits on the first passing check.
    pub fn descriptions_likely_match(&self, bank_text: &str, ledger_text: &str) -> bool {
        let bank = bank_text.to_lowercase();
        let ledger = ledger_text.to_lowercase();

        // Direct containment either way.
        if bank.contains(&ledger) || ledger.contains(&bank) {
            return true;
        }

        // Ledger descriptions are conventionally "Vendor Name - memo";
        // the part before the separator is the vendor candidate.
        let vendor = ledger.split(" - ").next().unwrap_or(&ledger).trim();
        if vendor.len() >= MIN_SIGNIFICANT_LEN && bank.contains(vendor) {
            return true;
        }

        if let Some(first_word) = vendor.split_whitespace().next() {
            if first_word.len() >= MIN_SIGNIFICANT_LEN && bank.contains(first_word) {
                return true;
            }
        }

        // Known brand variants ("AWS" on the statement, "Amazon Web
        // Services" on the ledger).
        if let Some(aliases) = self.lookup(vendor) {
            if aliases.iter().any(|alias| bank.contains(alias.as_str())) {
                return true;
            }
        }

        // Last resort: any significant token shared between the two texts.
        let bank_tokens: Vec<&str> = bank
            .split_whitespace()
            .filter(|t| t.len() >= MIN_SIGNIFICANT_LEN)
            .collect();
        ledger
            .split_whitespace()
            .filter(|t| t.len() >= MIN_SIGNIFICANT_LEN)
            .any(|lt| {
                bank_tokens
                    .iter()
                    .any(|bt| lt == *bt || bt.contains(lt) || lt.contains(bt))
            })
    }
}

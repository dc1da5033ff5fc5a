/// Providers counted by `count-providers` when none are given.
pub const KNOWN_PROVIDERS: [&str; 13] = [
    "Xfinity",
    "Metronet",
    "Cox",
    "Verizon Fios",
    "CenturyLink",
    "Spectrum",
    "AT&T",
    "T-Mobile",
    "Frontier",
    "WOW!",
    "Starlink",
    "Viasat",
    "Google Fiber",
];

/// A provider we expect to see labels for, with a note on why it may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub note: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            note: note.into(),
        }
    }
}

// major US ISPs, `/` separates alternate brand names
const MAJOR_ISPS: [(&str, &str); 17] = [
    ("Verizon Fios", "Major fiber provider, #3 in US"),
    ("Cox", "Only has PNG images, not machine-readable"),
    ("CenturyLink/Lumen/Quantum", "Website requires JS rendering"),
    ("Optimum/Altice", "Northeast cable provider"),
    ("Mediacom", "Midwest cable provider"),
    ("Windstream/Kinetic", "DSL/Fiber in rural areas"),
    ("Brightspeed", "Spun off from Lumen"),
    ("Breezeline", "Former Atlantic Broadband"),
    ("Ziply Fiber", "Northwest fiber provider"),
    ("Consolidated/Fidium", "New England fiber"),
    ("TDS Telecom", "Regional provider"),
    ("Sparklight", "Southwest cable"),
    ("Midco", "Upper Midwest"),
    ("EarthLink", "DSL reseller"),
    ("HughesNet", "Satellite provider"),
    ("Rise Broadband", "Fixed wireless"),
    ("Astound/RCN/Grande", "Regional cable"),
];

pub fn major_isps() -> Vec<Candidate> {
    MAJOR_ISPS
        .iter()
        .map(|(name, note)| Candidate::new(*name, *note))
        .collect()
}

//! Templated query rounds.
//!
//! Each round targets a different slice of the web: titled staff pages,
//! alternate title phrasings, professional-network profiles, the org's own
//! site, and recent news or grant announcements.

/// Upper bound on queries issued per round.
pub const MAX_QUERIES_PER_ROUND: usize = 5;

/// Short titles that search well, in priority order.
pub const PRIORITY_TITLES: &[&str] = &[
    "Computer Science Director",
    "CS Director",
    "CTE Director",
    "STEM Director",
    "Computer Science Coordinator",
    "CS Coordinator",
    "Curriculum Director",
    "Director of Technology",
];

/// A batch of queries issued together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRound {
    pub queries: Vec<String>,
}

impl QueryRound {
    fn new(mut queries: Vec<String>, cap: usize) -> Self {
        queries.truncate(cap);
        Self { queries }
    }
}

/// `"<title>" "<org>" email` for the top priority titles.
pub fn direct_title(org: &str) -> QueryRound {
    let queries = PRIORITY_TITLES
        .iter()
        .map(|title| format!("\"{title}\" \"{org}\" email"))
        .collect();
    QueryRound::new(queries, MAX_QUERIES_PER_ROUND)
}

/// Alternate phrasings that surface different pages than [`direct_title`].
pub fn title_variations(org: &str) -> QueryRound {
    let queries = vec![
        format!("\"{org}\" \"computer science\" coordinator contact"),
        format!("\"{org}\" STEM director"),
        format!("\"{org}\" CTE director email"),
        format!("\"{org}\" instructional technology coordinator"),
        format!("\"{org}\" curriculum director"),
    ];
    QueryRound::new(queries, MAX_QUERIES_PER_ROUND)
}

/// Profile searches scoped to the professional network.
pub fn professional_network(org: &str) -> QueryRound {
    let queries = vec![
        format!("site:linkedin.com \"computer science\" \"{org}\""),
        format!("site:linkedin.com \"STEM\" \"{org}\" director"),
        format!("site:linkedin.com \"instructional technology\" \"{org}\""),
    ];
    QueryRound::new(queries, 3)
}

/// The single query used to find the org's own website.
pub fn domain_lookup(org: &str, region: &str) -> String {
    format!("\"{org}\" official website {region}").trim_end().to_string()
}

/// Searches restricted to the discovered domain.
pub fn domain_scoped(domain: &str) -> QueryRound {
    let queries = vec![
        format!("site:{domain} \"computer science\" OR \"coding\" OR \"STEM\""),
        format!("site:{domain} staff directory"),
        format!("site:{domain} department contact"),
    ];
    QueryRound::new(queries, 3)
}

/// Grant and program news for the given year.
pub fn news_grants(org: &str, year: i32) -> QueryRound {
    let queries = vec![
        format!("\"{org}\" \"computer science\" grant {year}"),
        format!("\"{org}\" STEM program news {year}"),
        format!("\"{org}\" coding curriculum announcement"),
    ];
    QueryRound::new(queries, 2)
}

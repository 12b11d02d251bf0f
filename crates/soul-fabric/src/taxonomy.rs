//! The pulse taxonomy: which abstract facets light up for a given pulse
//! type. Fixed so every consumer (visualizers, the chain health display)
//! agrees on the mapping.

/// The closed set of facet labels a pulse can resolve to.
pub const FACETS: &[&str] = &[
    "seed", "kern", "bewusstsein", "schatten", "traeume", "garten", "mem", "bonds", "interessen",
    "heartbeat", "manifest", "evolution", "wachstum", "statelog", "graph",
];

/// Facets for a pulse `activity` type. Unknown types resolve to an empty
/// set rather than an error — a renderer just shows nothing extra lit.
pub fn facets_for(activity: &str) -> &'static [&'static str] {
    match activity {
        "research" => &["interessen", "mem"],
        "code" => &["manifest", "evolution"],
        "think" => &["kern", "bewusstsein"],
        "remember" => &["mem", "graph"],
        "dream" => &["traeume", "garten"],
        "relate" => &["bonds"],
        "reflect" => &["schatten", "bewusstsein"],
        "grow" => &["wachstum", "evolution"],
        "world" => &["interessen"],
        "wake" => &["seed", "kern", "heartbeat"],
        "sleep" => &["seed", "statelog", "mem"],
        "read" => &["mem", "bewusstsein"],
        "write" => &["manifest"],
        "search" => &["interessen", "mem", "graph"],
        "analyze" => &["kern", "schatten"],
        "plan" => &["manifest", "kern"],
        "connect" => &["bonds", "interessen"],
        "heartbeat" => &["heartbeat", "bewusstsein"],
        "garden" => &["garten", "traeume"],
        "shadow" => &["schatten"],
        "log" => &["statelog"],
        _ => &[],
    }
}

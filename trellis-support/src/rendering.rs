//! Text rendering for error messages.
//!
//! `std::any::type_name` produces fully qualified paths, which are noisy
//! in a resolution chain. These helpers turn them into something a
//! person can scan.

/// Joins a resolution chain with arrows.
///
/// # Examples
/// ```
/// use trellis_support::rendering::render_chain;
///
/// let chain = ["OrderService", "PaymentGateway", "OrderService"];
/// assert_eq!(render_chain(&chain), "OrderService → PaymentGateway → OrderService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut out = String::new();
    for (i, link) in chain.iter().enumerate() {
        if i > 0 {
            out.push_str(" → ");
        }
        out.push_str(link.as_ref());
    }
    out
}

/// Strips module paths from a type name, keeping generic structure.
///
/// ```
/// use trellis_support::rendering::short_type_name;
///
/// assert_eq!(short_type_name("shop::billing::InvoiceService"), "InvoiceService");
/// assert_eq!(
///     short_type_name("alloc::sync::Arc<dyn shop::billing::Ledger>"),
///     "Arc<dyn Ledger>"
/// );
/// ```
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' => {
                out.push_str(&segment);
                out.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    out.push_str(&segment);
    out
}

/// Picks registered names that look like the one requested.
///
/// Full-path containment ranks highest, then short-name containment,
/// then a shared prefix of at least three characters. At most `limit`
/// names are returned, best first.
pub fn did_you_mean<'a>(requested: &str, registered: &[&'a str], limit: usize) -> Vec<&'a str> {
    let wanted = requested.to_lowercase();
    let wanted_short = bare_name(requested);

    let mut ranked: Vec<(&'a str, usize)> = registered
        .iter()
        .filter(|name| !name.eq_ignore_ascii_case(requested))
        .filter_map(|&name| {
            let lower = name.to_lowercase();
            if lower.contains(&wanted) || wanted.contains(&lower) {
                return Some((name, 100));
            }

            let short = bare_name(name);
            if short.contains(&wanted_short) || wanted_short.contains(&short) {
                return Some((name, 80));
            }

            let prefix = short
                .chars()
                .zip(wanted_short.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (prefix >= 3).then_some((name, prefix * 10))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(limit).map(|(name, _)| name).collect()
}

/// Lowercased short name without a leading `dyn `.
fn bare_name(full: &str) -> String {
    let short = short_type_name(full);
    short.trim_start_matches("dyn ").to_lowercase()
}

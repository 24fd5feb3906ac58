//! [Pokebattler](https://www.pokebattler.com/raids): the raid boss list and
//! per-boss counter rankings.
//!
//! The pages render client-side, so every fetch is followed by a fixed
//! settle delay, and boss detail fetches are spaced out by the pipeline via
//! [`RaidSource::detail_delay`].

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, info, instrument, warn};

use super::http::{element_text, resolve_url, selector};
use super::{BossInfo, BossStub, HttpClient, RaidSource};
use crate::error::Result;
use crate::models::NewRaidCounter;

const BASE_URL: &str = "https://www.pokebattler.com";
const RAIDS_URL: &str = "https://www.pokebattler.com/raids";
const MAX_LISTED_BOSSES: usize = 50;
const MAX_DETAILED_BOSSES: usize = 10;
const MAX_COUNTERS: usize = 20;
const CONTEXT_CHARS: usize = 50;

const SKIPPED_LINKS: &[&str] = &["pokebox", "login", "register", "guide", "article"];

const FALLBACK_BOSSES: &[&str] = &["Dialga", "Palkia", "Giratina", "Regigigas"];

const POKEMON_TYPES: &[&str] = &[
    "Fire", "Water", "Grass", "Electric", "Ice", "Fighting", "Poison", "Ground", "Flying",
    "Psychic", "Bug", "Rock", "Ghost", "Dragon", "Dark", "Steel", "Fairy", "Normal",
];

/// Species looked for on a boss page, in no particular order; rank comes
/// from where each first appears.
const KNOWN_COUNTERS: &[&str] = &[
    "Mewtwo", "Rayquaza", "Dialga", "Palkia", "Groudon", "Kyogre", "Garchomp", "Salamence",
    "Dragonite", "Tyranitar", "Metagross", "Machamp", "Lucario", "Conkeldurr", "Terrakion",
    "Reshiram", "Zekrom", "Excadrill", "Rhyperior", "Rampardos", "Mamoswine", "Weavile",
    "Gengar", "Chandelure", "Giratina", "Landorus", "Thundurus", "Tornadus", "Electivire",
    "Magnezone", "Togekiss", "Gardevoir", "Roserade", "Venusaur", "Charizard", "Blastoise",
    "Sceptile", "Swampert", "Blaziken", "Kyurem", "Darkrai", "Heatran", "Latios", "Latias",
    "Entei", "Raikou", "Suicune", "Articuno", "Zapdos", "Moltres", "Snorlax", "Gyarados",
    "Vaporeon", "Jolteon", "Flareon", "Espeon", "Umbreon", "Leafeon", "Glaceon", "Sylveon",
    "Luxray", "Honchkrow", "Tangrowth", "Yanmega",
];

const LEGENDARIES: &[&str] = &[
    "Mewtwo", "Rayquaza", "Dialga", "Palkia", "Groudon", "Kyogre", "Reshiram", "Zekrom",
    "Giratina", "Landorus", "Thundurus", "Tornadus", "Kyurem", "Darkrai", "Heatran", "Latios",
    "Latias", "Entei", "Raikou", "Suicune", "Articuno", "Zapdos", "Moltres", "Terrakion",
];

fn boss_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/raids/(?:defenders/)?([A-Z_]+)").expect("valid boss link regex"))
}

fn cp_res() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"CP[:\s]+(\d+)[-\s]+(\d+)").expect("valid cp regex"),
            Regex::new(r"(\d{4})\s*[-–]\s*(\d{4})").expect("valid cp range regex"),
        ]
    })
}

/// One matcher per entry of [`POKEMON_TYPES`], in the same order.
fn type_res() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        POKEMON_TYPES
            .iter()
            .map(|kind| {
                Regex::new(&format!(r"(?i)\b{kind}\stype\b|Type:\s*{kind}"))
                    .expect("valid type regex")
            })
            .collect()
    })
}

fn weakness_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Weak(?:ness)?(?:es)?[:\s]+([A-Za-z\s,&]+)").expect("valid weakness regex")
    })
}

pub struct Pokebattler {
    client: HttpClient,
    render_settle: Duration,
    detail_delay: Duration,
}

impl Pokebattler {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            render_settle: Duration::from_secs(4),
            detail_delay: Duration::from_secs(2),
        }
    }

    pub fn with_delays(mut self, render_settle: Duration, detail_delay: Duration) -> Self {
        self.render_settle = render_settle;
        self.detail_delay = detail_delay;
        self
    }

    async fn load(&self, url: &str) -> Result<String> {
        let html = self.client.get_text(url).await?;
        tokio::time::sleep(self.render_settle).await;
        Ok(html)
    }
}

#[async_trait]
impl RaidSource for Pokebattler {
    fn name(&self) -> &'static str {
        "Pokebattler"
    }

    #[instrument(level = "debug", skip_all)]
    async fn fetch_raid_bosses(&self) -> Result<Vec<BossStub>> {
        let bosses = match self.load(RAIDS_URL).await {
            Ok(html) => parse_boss_list(&html),
            Err(e) => {
                warn!(error = %e, "Failed to load Pokebattler raids page");
                Vec::new()
            }
        };

        if bosses.is_empty() {
            warn!("No raid bosses found, using fallback list");
            return Ok(fallback_bosses());
        }

        info!(count = bosses.len(), "Found raid bosses");
        Ok(bosses)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_counters(&self, boss_name: &str) -> Result<(BossInfo, Vec<NewRaidCounter>)> {
        let mut last_error = None;
        let mut best = None;

        for url in boss_urls(boss_name) {
            let html = match self.load(&url).await {
                Ok(html) => html,
                Err(e) => {
                    debug!(%url, error = %e, "Boss page unavailable");
                    last_error = Some(e);
                    continue;
                }
            };

            if looks_not_found(&html) {
                debug!(%url, "Boss page not found");
                continue;
            }

            let (info, counters) = parse_boss_page(&html);
            if !counters.is_empty() {
                info!(boss = boss_name, count = counters.len(), "Found counters");
                return Ok((info, counters));
            }
            best = Some(info);
        }

        match (best, last_error) {
            (Some(info), _) => Ok((info, Vec::new())),
            (None, Some(e)) => Err(e),
            (None, None) => Err(anyhow::anyhow!("No Pokebattler page found for {}", boss_name).into()),
        }
    }

    fn detail_delay(&self) -> Duration {
        self.detail_delay
    }

    fn max_bosses(&self) -> usize {
        MAX_DETAILED_BOSSES
    }
}

fn fallback_bosses() -> Vec<BossStub> {
    FALLBACK_BOSSES
        .iter()
        .map(|name| BossStub {
            name: name.to_string(),
            tier: Some("5".to_string()),
            url: None,
            is_active: true,
        })
        .collect()
}

/// Candidate detail URLs, most likely first.
fn boss_urls(boss_name: &str) -> Vec<String> {
    let slug = boss_name.to_uppercase().replace([' ', '-'], "_");
    vec![
        format!("{BASE_URL}/raids/defenders/{slug}.html"),
        format!("{BASE_URL}/raids/{slug}"),
        format!("{BASE_URL}/raids/defenders/{slug}"),
    ]
}

fn looks_not_found(html: &str) -> bool {
    let head: String = html.chars().take(500).collect::<String>().to_lowercase();
    if head.contains("not found") {
        return true;
    }
    let document = Html::parse_document(html);
    document
        .select(&selector("title"))
        .next()
        .map(|t| element_text(t).to_lowercase().contains("404"))
        .unwrap_or(false)
}

/// "MEWTWO_SHADOW" -> "Mewtwo Shadow"; "(Shadow)"/"(Mega)" markers are dropped.
pub fn normalize_pokemon_name(raw: &str) -> String {
    raw.replace('_', " ")
        .replace("(Shadow)", "")
        .replace("(Mega)", "")
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_boss_list(html: &str) -> Vec<BossStub> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut bosses = Vec::new();

    for link in document.select(&selector("a[href]")) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let lowered = href.to_lowercase();
        if SKIPPED_LINKS.iter().any(|skip| lowered.contains(skip)) {
            continue;
        }
        let Some(slug) = boss_link_re().captures(href).and_then(|c| c.get(1)) else {
            continue;
        };

        let name = normalize_pokemon_name(slug.as_str());
        if name.chars().count() < 3 || !seen.insert(name.clone()) {
            continue;
        }

        bosses.push(BossStub {
            name,
            tier: Some(tier_from_context(link).to_string()),
            url: Some(resolve_url(href, BASE_URL)),
            is_active: true,
        });

        if bosses.len() == MAX_LISTED_BOSSES {
            break;
        }
    }

    bosses
}

fn tier_from_context(link: ElementRef<'_>) -> &'static str {
    let Some(parent) = link.parent().and_then(ElementRef::wrap) else {
        return "Unknown";
    };
    let text = element_text(parent).to_lowercase();
    if text.contains("tier 5") || text.contains("legendary") || text.contains("t5") {
        "5"
    } else if text.contains("tier 3") || text.contains("t3") {
        "3"
    } else if text.contains("tier 1") || text.contains("t1") {
        "1"
    } else if text.contains("mega") {
        "Mega"
    } else if text.contains("shadow") && text.contains("raid") {
        "Shadow"
    } else {
        "Unknown"
    }
}

pub fn parse_boss_page(html: &str) -> (BossInfo, Vec<NewRaidCounter>) {
    let document = Html::parse_document(html);
    let text = element_text(document.root_element());
    (extract_boss_info(&text), extract_counters(&text))
}

fn extract_boss_info(text: &str) -> BossInfo {
    let mut info = BossInfo::default();

    for re in cp_res() {
        let ranges: Vec<(i64, i64)> = re
            .captures_iter(text)
            .filter_map(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
            .take(2)
            .collect();
        if let Some(&(min, max)) = ranges.first() {
            info.cp_min = Some(min);
            info.cp_max = Some(max);
            if let Some(&(bmin, bmax)) = ranges.get(1) {
                info.cp_boosted_min = Some(bmin);
                info.cp_boosted_max = Some(bmax);
            }
            break;
        }
    }

    info.types = POKEMON_TYPES
        .iter()
        .zip(type_res())
        .filter(|(_, re)| re.is_match(text))
        .take(2)
        .map(|(kind, _)| kind.to_string())
        .collect();

    if let Some(listed) = weakness_re().captures(text).and_then(|c| c.get(1)) {
        info.weaknesses = POKEMON_TYPES
            .iter()
            .filter(|kind| listed.as_str().contains(*kind))
            .take(4)
            .map(|kind| kind.to_string())
            .collect();
    }

    info
}

fn extract_counters(text: &str) -> Vec<NewRaidCounter> {
    let mut found: Vec<(usize, &str)> = KNOWN_COUNTERS
        .iter()
        .filter_map(|name| text.find(name).map(|idx| (idx, *name)))
        .collect();
    found.sort_by_key(|(idx, _)| *idx);

    found
        .into_iter()
        .take(MAX_COUNTERS)
        .enumerate()
        .map(|(i, (idx, name))| {
            let context = surrounding(text, idx, CONTEXT_CHARS).to_lowercase();
            NewRaidCounter {
                pokemon_name: name.to_string(),
                rank: i as i64 + 1,
                is_shadow: context.contains("shadow"),
                is_mega: context.contains("mega"),
                is_legendary: LEGENDARIES.contains(&name),
                ..Default::default()
            }
        })
        .collect()
}

/// Up to `radius` characters either side of byte offset `idx`.
fn surrounding(text: &str, idx: usize, radius: usize) -> &str {
    let start = text[..idx]
        .char_indices()
        .rev()
        .nth(radius - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[idx..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| idx + i)
        .unwrap_or(text.len());
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slugs_into_names() {
        assert_eq!(normalize_pokemon_name("MEWTWO"), "Mewtwo");
        assert_eq!(normalize_pokemon_name("GIRATINA_ORIGIN_FORM"), "Giratina Origin Form");
        assert_eq!(normalize_pokemon_name("Mewtwo (Shadow)"), "Mewtwo");
    }

    #[test]
    fn delays_are_configurable() {
        let source = Pokebattler::new(HttpClient::new()).with_delays(Duration::ZERO, Duration::ZERO);
        assert_eq!(source.detail_delay(), Duration::ZERO);
        assert_eq!(source.max_bosses(), MAX_DETAILED_BOSSES);
        assert_eq!(Pokebattler::new(HttpClient::new()).detail_delay(), Duration::from_secs(2));
    }

    #[test]
    fn builds_detail_urls_from_names() {
        let urls = boss_urls("Ho-Oh Shadow");
        assert_eq!(urls[0], "https://www.pokebattler.com/raids/defenders/HO_OH_SHADOW.html");
        assert_eq!(urls[1], "https://www.pokebattler.com/raids/HO_OH_SHADOW");
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn parses_boss_list_with_tiers() {
        let html = r#"
            <div><span>Tier 5</span><a href="/raids/defenders/MEWTWO.html">Mewtwo</a></div>
            <div>Mega raids <a href="/raids/GENGAR_MEGA">Mega Gengar</a></div>
            <div><a href="/raids/defenders/MEWTWO.html">Mewtwo again</a></div>
            <div><a href="/raids/LOGIN">Log in</a></div>
            <div><a href="/raids/AB">Too short</a></div>
            <div><a href="/pokebox/MEWTWO">Box</a></div>
            <div><a href="/raids/defenders/KYOGRE">Kyogre</a></div>
        "#;
        let bosses = parse_boss_list(html);
        let names: Vec<_> = bosses.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Mewtwo", "Gengar Mega", "Kyogre"]);
        assert_eq!(bosses[0].tier.as_deref(), Some("5"));
        assert_eq!(bosses[1].tier.as_deref(), Some("Mega"));
        assert_eq!(bosses[2].tier.as_deref(), Some("Unknown"));
        assert_eq!(
            bosses[0].url.as_deref(),
            Some("https://www.pokebattler.com/raids/defenders/MEWTWO.html")
        );
        assert!(bosses.iter().all(|b| b.is_active));
    }

    #[test]
    fn extracts_stats_and_ranked_counters() {
        let html = r#"
            <html><head><title>Mewtwo Raid Counters</title></head><body>
              <p>Boss CP: 2275 - 2387, weather boosted CP: 2844 - 2984</p>
              <p>Type: Psychic</p>
              <p>Weaknesses: Bug, Ghost & Dark</p>
              <ol>
                <li>Shadow Tyranitar - Bite / Brutal Swing</li>
                <li>Gengar - Lick / Shadow Ball</li>
                <li>Darkrai - Snarl / Shadow Ball</li>
              </ol>
            </body></html>
        "#;
        let (info, counters) = parse_boss_page(html);
        assert_eq!(info.cp_min, Some(2275));
        assert_eq!(info.cp_max, Some(2387));
        assert_eq!(info.cp_boosted_min, Some(2844));
        assert_eq!(info.cp_boosted_max, Some(2984));
        assert_eq!(info.types, vec!["Psychic"]);
        assert_eq!(info.weaknesses, vec!["Bug", "Ghost", "Dark"]);

        let names: Vec<_> = counters.iter().map(|c| c.pokemon_name.as_str()).collect();
        assert_eq!(names, vec!["Mewtwo", "Tyranitar", "Gengar", "Darkrai"]);
        let ranks: Vec<_> = counters.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(counters[1].is_shadow);
        assert!(counters[3].is_legendary);
        assert!(!counters[2].is_legendary);
    }

    #[test]
    fn type_matchers_are_built_once() {
        assert_eq!(type_res().len(), POKEMON_TYPES.len());
        assert!(std::ptr::eq(type_res(), type_res()));

        let info = extract_boss_info("A Dragon type boss, also a steel type.");
        assert_eq!(info.types, vec!["Dragon", "Steel"]);
    }

    #[test]
    fn detects_missing_pages() {
        assert!(looks_not_found("<html><head><title>404</title></head></html>"));
        assert!(looks_not_found("<html><body>Page Not Found</body></html>"));
        assert!(!looks_not_found("<html><head><title>Mewtwo</title></head></html>"));
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let text = "ééééé Gengar ééééé";
        let idx = text.find("Gengar").unwrap();
        assert_eq!(surrounding(text, idx, 3), "éé Gen");
        assert_eq!(surrounding(text, 0, 3), "ééé");
    }

    #[test]
    fn fallback_list_is_tier_five() {
        let bosses = fallback_bosses();
        assert_eq!(bosses.len(), 4);
        assert!(bosses.iter().all(|b| b.tier.as_deref() == Some("5")));
    }
}

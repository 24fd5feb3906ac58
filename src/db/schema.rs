pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- news_items table
CREATE TABLE IF NOT EXISTS news_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT,
    summary TEXT,
    source TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    published_date TEXT,
    scraped_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_news_items_source ON news_items(source);
CREATE INDEX IF NOT EXISTS idx_news_items_published_date ON news_items(published_date DESC);

-- events table (url is optional, so uniqueness is checked by the writer)
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    event_type TEXT,
    start_date TEXT,
    end_date TEXT,
    description TEXT,
    summary TEXT,
    source TEXT NOT NULL,
    url TEXT,
    scraped_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_url ON events(url);
CREATE INDEX IF NOT EXISTS idx_events_start_date ON events(start_date);

-- raid_bosses table
CREATE TABLE IF NOT EXISTS raid_bosses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    pokemon_id INTEGER,
    tier TEXT,
    cp_min INTEGER,
    cp_max INTEGER,
    cp_boosted_min INTEGER,
    cp_boosted_max INTEGER,
    types TEXT,
    weaknesses TEXT,
    weather_boost TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    start_date TEXT,
    end_date TEXT,
    image_url TEXT,
    scraped_date TEXT NOT NULL,
    last_updated TEXT NOT NULL
);

-- raid_counters table
CREATE TABLE IF NOT EXISTS raid_counters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    raid_boss_id INTEGER NOT NULL REFERENCES raid_bosses(id) ON DELETE CASCADE,
    pokemon_name TEXT NOT NULL,
    rank INTEGER NOT NULL,
    fast_move TEXT,
    charge_move TEXT,
    pokemon_types TEXT,
    dps REAL,
    tdo REAL,
    ttw REAL,
    is_shadow INTEGER NOT NULL DEFAULT 0,
    is_mega INTEGER NOT NULL DEFAULT 0,
    is_legendary INTEGER NOT NULL DEFAULT 0,
    scraped_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_raid_counters_raid_boss_id ON raid_counters(raid_boss_id);
CREATE INDEX IF NOT EXISTS idx_raid_counters_rank ON raid_counters(rank);
"#;

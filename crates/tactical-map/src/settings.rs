use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Tactical Map - builds a self-contained map artifact from tactical
/// overlays and conflict datasets
pub struct Settings {
    /// KML overlay document to ingest
    #[clap(short, long, value_name = "FILE", default_value = "assets/doc.kml")]
    pub kml: PathBuf,

    /// Filtered conflict event dataset (GeoJSON FeatureCollection, feature
    /// list, or raw event records)
    #[clap(long, value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Loss-statistics snapshot produced by the scraper
    #[clap(long, value_name = "FILE")]
    pub stats: Option<PathBuf>,

    /// Countries GeoJSON used for the UA/RU border overlays
    #[clap(long, value_name = "FILE")]
    pub borders: Option<PathBuf>,

    /// Output artifact path
    #[clap(short, long, value_name = "FILE", default_value = "outputs/map.json")]
    pub output: PathBuf,

    /// Process placemarks in every folder, bypassing the keep-list
    #[clap(long)]
    pub all_folders: bool,
}

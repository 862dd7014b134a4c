use catalog::{
    parse_motif_catalog, parse_transition_catalog, AssetBase, AssetResolver, CatalogState,
    Endpoint, EndpointOptions, FileKey,
};
use composer::{Composer, ComposerError};
use exporters::*;
use std::fs;
use std::path::Path;

fn composer() -> Composer {
    let motifs = parse_motif_catalog(
        "id,name,planes,comment,file,-,w,h,d,len\n\
         1,Heart,100,red,,,1,1,1,1\n\
         2,Star,200,gold,,,1,1,1,1\n",
    );
    let transitions = parse_transition_catalog("id,name,comment,file\n1,Fade,soft,T_fade\n");
    let mut c = Composer::new(CatalogState::new(motifs, transitions));
    c.initialize(EndpointOptions::default());
    c
}

fn write_icon(root: &Path, dir: &str, key: &str) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    let img = image::RgbImage::from_fn(64, 48, |x, y| image::Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
    img.save(dir.join(format!("{key}.jpg"))).unwrap();
}

fn populated(c: &mut Composer) {
    c.add_motif_by_key(&FileKey::new("0001_Heart")).unwrap();
    c.add_motif_by_key(&FileKey::new("0002_Star")).unwrap();
    let gap = c.state().placeholders()[0];
    c.add_transition_by_key(&FileKey::new("T_fade"), gap).unwrap();
    c.select_endpoint(Endpoint::Takeoff, "Rainbow").unwrap();
}

#[test]
fn pdf_export_embeds_icons_and_tolerates_missing_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    write_icon(&assets, "image/motif/icon", "0001_Heart");
    write_icon(&assets, "image/transition/icon", "T_fade");
    // 0002_Star and the takeoff icon are missing on purpose

    let output = tmp.path().join("out/stock.pdf");
    let config = ExportConfig {
        output_path: output.clone(),
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(config, AssetResolver::new(AssetBase::Local(assets)));
    let mut c = composer();
    populated(&mut c);

    let written = exporter.export(&mut c).unwrap();
    assert_eq!(written, output);
    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(!c.is_exporting());

    let leftovers: Vec<_> = fs::read_dir(tmp.path().join("out")).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn json_export_describes_sequence_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("stock.json");
    let config = ExportConfig {
        format: ExportFormat::Json,
        output_path: output.clone(),
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(
        config,
        AssetResolver::new(AssetBase::Remote("https://cdn.example/stock".into())),
    );
    let mut c = composer();
    populated(&mut c);
    exporter.export(&mut c).unwrap();

    let data: ExportData = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(data.sequence.len(), 5);
    assert_eq!(data.layout.columns[0].len(), 2);
    assert_eq!(data.layout.header.unwrap().text, "Takeoff: Rainbow");
    assert_eq!(data.metadata.config.format, ExportFormat::Json);

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let nodes: Vec<&str> = value["sequence"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["node"].as_str().unwrap())
        .collect();
    assert_eq!(nodes, ["endpoint", "card", "card", "card", "endpoint"]);
}

#[test]
fn empty_footer_is_rejected_before_any_output() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("stock.pdf");
    let config = ExportConfig {
        output_path: output.clone(),
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(config, AssetResolver::default());
    let mut c = composer();

    let err = exporter.export(&mut c).unwrap_err();
    assert!(matches!(err, ExportError::Composer(ComposerError::NothingToExport)));
    assert!(!output.exists());
    assert!(!c.is_exporting());
}

#[test]
fn failed_write_unfreezes_composer_and_leaves_no_file() {
    let tmp = tempfile::tempdir().unwrap();
    // a regular file where the output directory should be
    let blocker = tmp.path().join("blocked");
    fs::write(&blocker, b"x").unwrap();
    let output = blocker.join("stock.pdf");
    let config = ExportConfig {
        output_path: output.clone(),
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(config, AssetResolver::default());
    let mut c = composer();
    populated(&mut c);

    assert!(matches!(exporter.export(&mut c), Err(ExportError::Io(_))));
    assert!(!output.exists());
    assert!(!c.is_exporting());
    assert!(c.add_motif_by_key(&FileKey::new("0001_Heart")).is_ok());
}

#[test]
fn non_latin_names_still_export_with_builtin_fonts() {
    let motifs = parse_motif_catalog(
        "id,name,planes,comment,file,-,w,h,d,len\n\
         231,離陸,100,red,,,1,1,1,1\n",
    );
    let mut c = Composer::new(CatalogState::new(motifs, Vec::new()));
    c.initialize(EndpointOptions::default());
    c.add_motif_by_key(&FileKey::new("0231_離陸")).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("stock.pdf");
    let config = ExportConfig {
        output_path: output.clone(),
        title: "ストック".into(),
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(config, AssetResolver::default());
    exporter.export(&mut c).unwrap();
    assert!(fs::read(&output).unwrap().starts_with(b"%PDF"));
}

#[test]
fn missing_label_font_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("stock.pdf");
    let config = ExportConfig {
        output_path: output.clone(),
        font_path: Some(tmp.path().join("NotoSansJP.ttf")),
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(config, AssetResolver::default());
    let mut c = composer();
    populated(&mut c);

    assert!(matches!(exporter.export(&mut c), Err(ExportError::Io(_))));
    assert!(!output.exists());
    assert!(!c.is_exporting());
}

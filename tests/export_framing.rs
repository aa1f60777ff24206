use fanchart::{Chart, Configuration, PersonId, PersonNode, StaticDataSource};

fn dataset() -> Vec<PersonNode> {
    vec![
        PersonNode {
            id: PersonId(1),
            xref: "I1".to_string(),
            depth: 0,
            url: String::new(),
            update_url: String::new(),
            name: "Root".to_string(),
            timespan: "1920-1999".to_string(),
        },
        PersonNode {
            id: PersonId(2),
            xref: "I2".to_string(),
            depth: 1,
            url: String::new(),
            update_url: String::new(),
            name: "Father".to_string(),
            timespan: String::new(),
        },
        PersonNode {
            id: PersonId(3),
            xref: String::new(),
            depth: 1,
            url: String::new(),
            update_url: String::new(),
            name: String::new(),
            timespan: String::new(),
        },
    ]
}

#[test]
fn export_and_live_view_share_the_same_framing() {
    let mut config = Configuration::default();
    config.container_width = 800.0;
    config.container_height = 600.0;
    let mut chart = Chart::new(config, StaticDataSource::new()).unwrap();
    chart.draw(dataset()).unwrap();

    let viewport = chart.viewport().unwrap();
    let svg = chart.svg().unwrap();
    assert!(svg.contains(&format!(r#"viewBox="{}""#, viewport.view_box())));

    let image = chart.export().unwrap();
    assert_eq!(f64::from(image.width), viewport.width.ceil());
    assert_eq!(f64::from(image.height), viewport.height.ceil());
}

#[test]
fn exported_png_decodes_at_the_viewport_size() {
    let mut chart = Chart::new(Configuration::default(), StaticDataSource::new()).unwrap();
    chart.draw(dataset()).unwrap();

    let image = chart.export().unwrap();
    let decoded = image::load_from_memory(&image.png).unwrap();
    assert_eq!(decoded.width(), image.width);
    assert_eq!(decoded.height(), image.height);
}

#[test]
fn export_to_file_defaults_the_filename() {
    let dir = std::path::PathBuf::from("target").join("export_framing");
    let mut chart = Chart::new(Configuration::default(), StaticDataSource::new()).unwrap();
    chart.draw(dataset()).unwrap();

    let path = chart.export_to_file(&dir, None).unwrap();
    assert!(path.ends_with(fanchart::DEFAULT_FILENAME));
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn viewport_is_recomputed_per_call_never_cached() {
    let mut chart = Chart::new(Configuration::default(), StaticDataSource::new()).unwrap();
    chart.draw(dataset()).unwrap();
    let wide = chart.viewport().unwrap();

    chart.draw(dataset()[..1].to_vec()).unwrap();
    let small = chart.viewport().unwrap();

    assert!(wide.width > small.width);
    // The lone root disc is 170 wide plus padding; height is held at the minimum.
    assert_eq!(small.width, 190.0);
    assert_eq!(small.height, 520.0);
}

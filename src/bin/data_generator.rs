use rand::Rng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

const BOROUGHS: [(&str, &[&str]); 5] = [
    ("Manhattan", &["Harlem", "Midtown", "East Village", "Chelsea", "Inwood"]),
    ("Brooklyn", &["Williamsburg", "Bushwick", "Bedford-Stuyvesant", "Park Slope"]),
    ("Queens", &["Astoria", "Long Island City", "Flushing", "Laurelton"]),
    ("Bronx", &["Fordham", "Mott Haven", "Riverdale"]),
    ("Staten Island", &["St. George", "Tompkinsville"]),
];

const ROOM_TYPES: [&str; 4] = ["Entire home/apt", "Private room", "Shared room", "Hotel room"];

fn main() -> std::io::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/listings.csv".to_string());
    let rows: usize = std::env::args()
        .nth(2)
        .and_then(|n| n.parse().ok())
        .unwrap_or(100_000);

    if let Some(dir) = std::path::Path::new(&path).parent() {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "id,name,neighbourhood_group,neighbourhood,room_type,price,minimum_nights,last_review"
    )?;

    let mut rng = rand::rng();
    for i in 0..rows {
        let (group, neighbourhoods) = BOROUGHS[rng.random_range(0..BOROUGHS.len())];
        let neighbourhood = neighbourhoods[rng.random_range(0..neighbourhoods.len())];
        let room_type = ROOM_TYPES[rng.random_range(0..ROOM_TYPES.len())];
        let price = rng.random_range(30..1000);
        let nights = [1, 2, 3, 7, 14, 30, 31, 60][rng.random_range(0..8)];
        let last_review = if rng.random_bool(0.8) {
            format!(
                "{}-{:02}-{:02}",
                rng.random_range(2011..=2023),
                rng.random_range(1..=12),
                rng.random_range(1..=28)
            )
        } else {
            String::new()
        };
        writeln!(
            writer,
            "{i},\"Listing {i}, {neighbourhood}\",{group},{neighbourhood},{room_type},{price},{nights},{last_review}"
        )?;
    }
    writer.flush()?;

    println!("Sample listings CSV generated: {} ({} rows)", path, rows);
    Ok(())
}

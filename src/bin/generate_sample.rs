use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// (abbreviation, population) for the 50 states plus DC.
const STATES: [(&str, i64); 51] = [
    ("AL", 5_024_279), ("AK", 733_391), ("AZ", 7_151_502), ("AR", 3_011_524),
    ("CA", 39_538_223), ("CO", 5_773_714), ("CT", 3_605_944), ("DE", 989_948),
    ("DC", 689_545), ("FL", 21_538_187), ("GA", 10_711_908), ("HI", 1_455_271),
    ("ID", 1_839_106), ("IL", 12_812_508), ("IN", 6_785_528), ("IA", 3_190_369),
    ("KS", 2_937_880), ("KY", 4_505_836), ("LA", 4_657_757), ("ME", 1_362_359),
    ("MD", 6_177_224), ("MA", 7_029_917), ("MI", 10_077_331), ("MN", 5_706_494),
    ("MS", 2_961_279), ("MO", 6_154_913), ("MT", 1_084_225), ("NE", 1_961_504),
    ("NV", 3_104_614), ("NH", 1_377_529), ("NJ", 9_288_994), ("NM", 2_117_522),
    ("NY", 20_201_249), ("NC", 10_439_388), ("ND", 779_094), ("OH", 11_799_448),
    ("OK", 3_959_353), ("OR", 4_237_256), ("PA", 13_002_700), ("RI", 1_097_379),
    ("SC", 5_118_425), ("SD", 886_667), ("TN", 6_910_840), ("TX", 29_145_505),
    ("UT", 3_271_616), ("VT", 643_077), ("VA", 8_631_393), ("WA", 7_705_281),
    ("WV", 1_793_716), ("WI", 5_893_718), ("WY", 576_851),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// One generated state row; counts are per billion miles, like the
/// NHTSA-derived `car_crashes` table.
struct Row {
    abbrev: &'static str,
    total: f64,
    speeding: f64,
    alcohol: f64,
    distracted: f64,
    no_previous: f64,
    no_injuries: f64,
    population: i64,
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    STATES
        .iter()
        .map(|&(abbrev, population)| {
            let total = rng.uniform(5.9, 23.9);
            // Speeding and alcohol shares scale loosely with the total so the
            // trend lines have something to show.
            let speeding = total * rng.uniform(0.15, 0.45);
            let alcohol = total * rng.uniform(0.2, 0.4);
            let distracted = total * rng.uniform(0.7, 1.0);
            let no_previous = total * rng.uniform(0.75, 0.95);
            let no_injuries = total * rng.uniform(0.5, 0.8);
            Row {
                abbrev,
                total: round3(total),
                speeding: round3(speeding),
                alcohol: round3(alcohol),
                distracted: round3(distracted),
                no_previous: round3(no_previous),
                no_injuries: round3(no_injuries),
                population,
            }
        })
        .collect()
}

fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v.get(v.len() / 2).copied().unwrap_or(0.0)
}

const HEADER: [&str; 8] = [
    "abbrev",
    "total",
    "speeding",
    "alcohol",
    "distracted",
    "no_previous",
    "no_injuries",
    "population",
];

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    w.write_record(HEADER)?;
    for r in rows {
        w.write_record([
            r.abbrev.to_string(),
            r.total.to_string(),
            r.speeding.to_string(),
            r.alcohol.to_string(),
            r.distracted.to_string(),
            r.no_previous.to_string(),
            r.no_injuries.to_string(),
            r.population.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Boolean variant: speeding / alcohol become "above the median" flags.
fn write_flags_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let speeding_median = median(rows.iter().map(|r| r.speeding));
    let alcohol_median = median(rows.iter().map(|r| r.alcohol));

    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    w.write_record(HEADER)?;
    for r in rows {
        w.write_record([
            r.abbrev.to_string(),
            r.total.to_string(),
            (r.speeding > speeding_median).to_string(),
            (r.alcohol > alcohol_median).to_string(),
            r.distracted.to_string(),
            r.no_previous.to_string(),
            r.no_injuries.to_string(),
            r.population.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let float = |f: fn(&Row) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("abbrev", DataType::Utf8, false),
        Field::new("total", DataType::Float64, false),
        Field::new("speeding", DataType::Float64, false),
        Field::new("alcohol", DataType::Float64, false),
        Field::new("distracted", DataType::Float64, false),
        Field::new("no_previous", DataType::Float64, false),
        Field::new("no_injuries", DataType::Float64, false),
        Field::new("population", DataType::Int64, false),
        Field::new("high_speeding", DataType::Boolean, false),
    ]));

    let speeding_median = median(rows.iter().map(|r| r.speeding));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(rows.iter().map(|r| r.abbrev).collect::<Vec<_>>())),
            float(|r| r.total),
            float(|r| r.speeding),
            float(|r| r.alcohol),
            float(|r| r.distracted),
            float(|r| r.no_previous),
            float(|r| r.no_injuries),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.population).collect::<Vec<_>>())),
            Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.speeding > speeding_median).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = Path::new(std::env::args().nth(1).as_deref().unwrap_or("data")).to_path_buf();
    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let csv_path = out_dir.join("car_crashes.csv");
    let flags_path = out_dir.join("car_crashes_flags.csv");
    let parquet_path = out_dir.join("car_crashes.parquet");
    write_csv(&csv_path, &rows)?;
    write_flags_csv(&flags_path, &rows)?;
    write_parquet(&parquet_path, &rows)?;

    log::info!("wrote {} states", rows.len());
    println!(
        "Wrote {} rows to {}, {} and {}",
        rows.len(),
        csv_path.display(),
        flags_path.display(),
        parquet_path.display()
    );
    Ok(())
}

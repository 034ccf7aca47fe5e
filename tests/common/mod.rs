//! Shared listing fixtures for the integration tests

#![allow(dead_code)]

use rental_pricer::encoding::{build_schema, FeatureSchema};
use rental_pricer::prediction::LinearPriceModel;
use rental_pricer::preprocessing::{CleanedDataset, Cleaner};
use rental_pricer::utils::DataLoader;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "id,host_since,host_response_time,host_response_rate,host_acceptance_rate,host_is_superhost,host_listings_count,host_has_profile_pic,host_identity_verified,host_verifications,neighbourhood_cleansed,latitude,longitude,room_type,accommodates,bathrooms_text,bedrooms,beds,amenities,price,minimum_nights,maximum_nights,has_availability,availability_365,review_scores_rating,instant_bookable";

pub const ROWS: [&str; 6] = [
    r#"1,2015-03-01,within an hour,100%,95%,t,2,t,t,"['email', 'phone']",Verdun,45.45,-73.57,Entire home/apt,4,1 bath,2,2,"[""Wifi"", ""Kitchen"", ""Heating""]",$120.00,2,30,t,200,4.8,f"#,
    r#"2,2018-07-15,within a day,N/A,80%,f,1,t,f,"['phone']",Verdun,45.46,-73.56,Private room,2,1 shared bath,,1,"[""Wifi"", ""Heating""]",$85.00,1,14,t,120,4.5,t"#,
    r#"3,2019-01-20,within an hour,90%,100%,f,1,t,t,"['email', 'work_email']",Outremont,45.52,-73.61,Private room,1,1 shared bath,1,1,"[""Wifi""]",$95.00,3,60,t,300,4.9,f"#,
    r#"4,2012-11-02,within an hour,100%,100%,t,12,t,t,"['email', 'phone']",Outremont,45.52,-73.60,Entire home/apt,8,3 baths,4,5,"[""Pool"", ""Wifi""]","$2,000.00",2,30,t,50,4.7,t"#,
    r#"5,2016-05-05,within a day,70%,60%,f,3,t,t,"['phone']",Verdun,45.44,-73.58,Entire home/apt,3,1 bath,1,2,"[""Kitchen""]",$110.00,400,1125,f,0,,f"#,
    r#"6,2020-09-09,within a few hours,100%,85%,f,1,t,t,"['email']",Outremont,45.51,-73.62,Private room,2,Half-bath,1,1,"[""Kitchen"", ""Wifi""]",$70.00,30,365,t,250,4.6,f"#,
];

/// Write the six-listing Montreal export into `dir`
pub fn write_listings(dir: &Path) -> PathBuf {
    let rows: Vec<String> = ROWS.iter().map(|r| r.to_string()).collect();
    write_rows(dir, &rows)
}

/// Write `rows` under the fixture header as `montreal.csv`
pub fn write_rows(dir: &Path, rows: &[String]) -> PathBuf {
    let path = dir.join("montreal.csv");
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    std::fs::write(&path, body).unwrap();
    path
}

/// Clean the fixture export with the default configuration
pub fn cleaned_montreal() -> CleanedDataset {
    let dir = tempfile::tempdir().unwrap();
    let raw = DataLoader::new().load_csv(write_listings(dir.path())).unwrap();
    Cleaner::new().clean(&raw).unwrap()
}

/// log(price) = 4.0 + 0.25 * accommodates
pub fn linear_model(schema: FeatureSchema) -> LinearPriceModel {
    let mut weights = vec![0.0; schema.len()];
    weights[schema.position("accommodates").unwrap()] = 0.25;
    LinearPriceModel::new(schema.city().to_string(), schema, 4.0, weights).unwrap()
}

/// Write `montreal.json` into `dir`, trained on the fixture's own schema
pub fn write_model(dir: &Path) -> PathBuf {
    let schema = build_schema("montreal", &cleaned_montreal()).unwrap();
    let path = dir.join("montreal.json");
    linear_model(schema).save(&path).unwrap();
    path
}

//! Prediction Generator
//!
//! Sends varied synthetic customers to a running service so the audit log
//! fills with realistic traffic for drift monitoring.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Every feature the reference model was trained on, all zero by default
const ALL_FEATURES: [&str; 30] = [
    "tenure",
    "MonthlyCharges",
    "TotalCharges",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "PhoneService",
    "PaperlessBilling",
    "gender_Male",
    "MultipleLines_No_phone_service",
    "MultipleLines_Yes",
    "InternetService_Fiber_optic",
    "InternetService_No",
    "OnlineSecurity_No_internet_service",
    "OnlineSecurity_Yes",
    "OnlineBackup_No_internet_service",
    "OnlineBackup_Yes",
    "DeviceProtection_No_internet_service",
    "DeviceProtection_Yes",
    "TechSupport_No_internet_service",
    "TechSupport_Yes",
    "StreamingTV_No_internet_service",
    "StreamingTV_Yes",
    "StreamingMovies_No_internet_service",
    "StreamingMovies_Yes",
    "Contract_One_year",
    "Contract_Two_year",
    "PaymentMethod_Credit_card_automatic",
    "PaymentMethod_Electronic_check",
    "PaymentMethod_Mailed_check",
];

#[derive(Debug, Clone, Copy)]
enum Profile {
    HighRisk,
    LowRisk,
    MediumRisk,
    NewCustomer,
    Loyal,
}

impl Profile {
    const ALL: [Profile; 5] = [
        Profile::HighRisk,
        Profile::LowRisk,
        Profile::MediumRisk,
        Profile::NewCustomer,
        Profile::Loyal,
    ];

    fn describe(&self) -> &'static str {
        match self {
            Profile::HighRisk => "Short tenure, high charges, month-to-month",
            Profile::LowRisk => "Long tenure, low charges, two-year contract",
            Profile::MediumRisk => "Medium tenure, medium charges, one-year contract",
            Profile::NewCustomer => "Very new customer",
            Profile::Loyal => "Very loyal customer",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionReply {
    churn_prediction: String,
    churn_probability: f64,
    confidence: String,
}

/// Customer generator for load testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn pick_profile(&mut self) -> Profile {
        Profile::ALL[self.rng.gen_range(0..Profile::ALL.len())]
    }

    fn flag(&mut self) -> u8 {
        self.rng.gen_range(0..=1)
    }

    /// Build a full request body for the given profile
    fn generate(&mut self, profile: Profile) -> Map<String, Value> {
        let mut customer: Map<String, Value> = ALL_FEATURES
            .iter()
            .map(|name| (name.to_string(), Value::from(0)))
            .collect();

        let (tenure, monthly): (u32, f64) = match profile {
            Profile::HighRisk => (self.rng.gen_range(1..=6), self.rng.gen_range(80.0..120.0)),
            Profile::LowRisk => (self.rng.gen_range(48..=72), self.rng.gen_range(20.0..50.0)),
            Profile::MediumRisk => (self.rng.gen_range(12..=36), self.rng.gen_range(50.0..80.0)),
            Profile::NewCustomer => (self.rng.gen_range(0..=3), self.rng.gen_range(60.0..100.0)),
            Profile::Loyal => (self.rng.gen_range(60..=72), self.rng.gen_range(30.0..70.0)),
        };
        let total = if tenure > 0 {
            tenure as f64 * monthly
        } else {
            self.rng.gen_range(0.0..100.0)
        };

        let gender = self.flag();
        let mut flags: Vec<(&str, u8)> = vec![("PhoneService", 1), ("gender_Male", gender)];
        match profile {
            Profile::HighRisk => flags.extend([
                ("SeniorCitizen", 1),
                ("PaperlessBilling", 1),
                ("InternetService_Fiber_optic", 1),
                ("PaymentMethod_Electronic_check", 1),
            ]),
            Profile::LowRisk => flags.extend([
                ("Partner", 1),
                ("Dependents", 1),
                ("Contract_Two_year", 1),
                ("PaymentMethod_Credit_card_automatic", 1),
                ("OnlineSecurity_Yes", 1),
                ("TechSupport_Yes", 1),
            ]),
            Profile::MediumRisk => {
                let senior = self.flag();
                let partner = self.flag();
                let dependents = self.flag();
                let paperless = self.flag();
                let fiber = self.flag();
                flags.extend([
                    ("SeniorCitizen", senior),
                    ("Partner", partner),
                    ("Dependents", dependents),
                    ("PaperlessBilling", paperless),
                    ("InternetService_Fiber_optic", fiber),
                    ("Contract_One_year", 1),
                    ("PaymentMethod_Mailed_check", 1),
                ])
            }
            Profile::NewCustomer => {
                let partner = self.flag();
                flags.extend([
                    ("Partner", partner),
                    ("PaperlessBilling", 1),
                    ("InternetService_Fiber_optic", 1),
                    ("PaymentMethod_Electronic_check", 1),
                ])
            }
            Profile::Loyal => {
                let senior = self.flag();
                flags.extend([
                    ("SeniorCitizen", senior),
                    ("Partner", 1),
                    ("Dependents", 1),
                    ("InternetService_No", 1),
                    ("Contract_Two_year", 1),
                    ("PaymentMethod_Credit_card_automatic", 1),
                    ("OnlineSecurity_Yes", 1),
                    ("TechSupport_Yes", 1),
                    ("StreamingTV_Yes", 1),
                    ("StreamingMovies_Yes", 1),
                ])
            }
        }

        customer.insert("tenure".to_string(), Value::from(tenure));
        customer.insert("MonthlyCharges".to_string(), Value::from(monthly));
        customer.insert("TotalCharges".to_string(), Value::from(total));
        for (name, value) in flags {
            customer.insert(name.to_string(), Value::from(value));
        }
        customer
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prediction_generator=info".parse()?),
        )
        .init();

    info!("Starting Prediction Generator");

    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);
    let delay_ms: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(base_url = %base_url, count = count, delay_ms = delay_ms, "Configuration loaded");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    match client.get(format!("{}/health", base_url)).send().await {
        Ok(resp) if resp.status().is_success() => info!("Service is healthy and ready"),
        Ok(resp) => {
            warn!(status = %resp.status(), "Health check failed. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
        Err(e) => {
            warn!(error = %e, "Cannot reach service. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    }

    let predict_url = format!("{}/predict", base_url);
    let mut generator = CustomerGenerator::new();
    let mut successful = 0u64;
    let mut failed = 0u64;

    for i in 0..count {
        let profile = generator.pick_profile();
        let customer = generator.generate(profile);

        match client.post(&predict_url).json(&customer).send().await {
            Ok(resp) if resp.status().is_success() => {
                let reply: PredictionReply = resp.json().await?;
                successful += 1;
                info!(
                    "[{}/{}] {}: {} (prob: {:.3}, confidence: {})",
                    i + 1,
                    count,
                    profile.describe(),
                    reply.churn_prediction,
                    reply.churn_probability,
                    reply.confidence
                );
            }
            Ok(resp) => {
                failed += 1;
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "[{}/{}] Prediction rejected", i + 1, count);
            }
            Err(e) => {
                failed += 1;
                warn!(error = %e, "[{}/{}] Request failed", i + 1, count);
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! {} successful, {} failed. Predictions are appended to the service audit log.",
        successful, failed
    );

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = CustomerGenerator::new();

    for i in 0..count {
        let profile = generator.pick_profile();
        let customer = generator.generate(profile);
        let json = serde_json::to_string_pretty(&customer)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample customer {} ({}):\n{}", i + 1, profile.describe(), json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

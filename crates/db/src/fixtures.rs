use rolodex_core::domain::customer::{CustomerInput, CustomerStatus};

use crate::repositories::{CustomerRepository, RepositoryError};

/// Demo customers for local development and smoke checks.
const SEED_CUSTOMERS: &[SeedCustomer] = &[
    SeedCustomer {
        name: "山田 太郎",
        email: "taro.yamada@example.com",
        phone: Some("03-1234-5678"),
        zip_code: Some("1000001"),
        prefecture: Some("東京都"),
        city: Some("千代田区"),
        address1: Some("千代田"),
        address2: Some("1-1"),
        status: CustomerStatus::Active,
    },
    SeedCustomer {
        name: "鈴木 花子",
        email: "hanako.suzuki@example.com",
        phone: Some("06-9876-5432"),
        zip_code: Some("5300001"),
        prefecture: Some("大阪府"),
        city: Some("大阪市北区"),
        address1: Some("梅田"),
        address2: None,
        status: CustomerStatus::Lead,
    },
    SeedCustomer {
        name: "佐藤 健",
        email: "ken.sato@example.com",
        phone: Some("052-111-2222"),
        zip_code: Some("4600008"),
        prefecture: Some("愛知県"),
        city: Some("名古屋市中区"),
        address1: Some("栄"),
        address2: Some("3-4-5"),
        status: CustomerStatus::Inactive,
    },
    SeedCustomer {
        name: "Emily Clark",
        email: "emily.clark@example.com",
        phone: None,
        zip_code: None,
        prefecture: None,
        city: None,
        address1: None,
        address2: None,
        status: CustomerStatus::Lead,
    },
];

#[derive(Debug, Clone, Copy)]
struct SeedCustomer {
    name: &'static str,
    email: &'static str,
    phone: Option<&'static str>,
    zip_code: Option<&'static str>,
    prefecture: Option<&'static str>,
    city: Option<&'static str>,
    address1: Option<&'static str>,
    address2: Option<&'static str>,
    status: CustomerStatus,
}

impl SeedCustomer {
    fn input(&self) -> CustomerInput {
        CustomerInput {
            name: self.name.to_string(),
            email: self.email.to_string(),
            phone: self.phone.map(str::to_string),
            zip_code: self.zip_code.map(str::to_string),
            prefecture: self.prefecture.map(str::to_string),
            city: self.city.map(str::to_string),
            address1: self.address1.map(str::to_string),
            address2: self.address2.map(str::to_string),
            status: Some(self.status),
        }
    }
}

pub struct DemoDataset;

impl DemoDataset {
    /// Creates every demo customer that is not already present (matched by
    /// email), so loading twice does not duplicate records.
    pub async fn load(repository: &CustomerRepository) -> Result<SeedResult, RepositoryError> {
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        for seed in SEED_CUSTOMERS {
            if Self::find_by_email(repository, seed.email).await {
                skipped.push(seed.email);
                continue;
            }
            let customer = repository.create_customer(seed.input()).await?;
            created.push(SeededCustomer { id: customer.id.0, email: seed.email });
        }

        Ok(SeedResult { created, skipped })
    }

    /// Checks that each demo customer can be found by search.
    pub async fn verify(repository: &CustomerRepository) -> VerificationResult {
        let mut checks = Vec::new();
        for seed in SEED_CUSTOMERS {
            checks.push((seed.email, Self::find_by_email(repository, seed.email).await));
        }

        VerificationResult { all_present: checks.iter().all(|(_, present)| *present), checks }
    }

    async fn find_by_email(repository: &CustomerRepository, email: &str) -> bool {
        repository
            .search_customers(email)
            .await
            .iter()
            .any(|customer| customer.email.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub created: Vec<SeededCustomer>,
    pub skipped: Vec<&'static str>,
}

#[derive(Debug)]
pub struct SeededCustomer {
    pub id: String,
    pub email: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

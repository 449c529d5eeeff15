use anyhow::{Context, Result};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Database;

use crate::models::profile::Profile;
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::day_key;

use super::progression;

pub struct ProfileService {
    mongo: Database,
}

impl ProfileService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn profiles(&self) -> mongodb::Collection<Profile> {
        self.mongo.collection("profiles")
    }

    /// Load the user's profile, creating a fresh one on first contact.
    /// Calendar-day bookkeeping (daily counter reset, day-streak lapse) is
    /// applied here so every caller sees current-day state.
    pub async fn load_or_create(&self, user_id: &str) -> Result<Profile> {
        let now = Utc::now();

        let mut profile = match self
            .profiles()
            .find_one(doc! { "_id": user_id })
            .await
            .context("Failed to load profile")?
        {
            Some(profile) => profile,
            None => self.create(user_id).await?,
        };

        let today = day_key(now);
        let rolled = progression::roll_over_day(&mut profile, &today);
        let lapsed = progression::lapse_day_streak(&mut profile, now.date_naive());

        if rolled || lapsed {
            self.save(&mut profile).await?;
        }

        Ok(profile)
    }

    async fn create(&self, user_id: &str) -> Result<Profile> {
        let profile = Profile::new(user_id, Utc::now());

        match self.profiles().insert_one(&profile).await {
            Ok(_) => {
                tracing::info!("Created profile for user {}", user_id);
                Ok(profile)
            }
            Err(e) => {
                // Two first requests may race; the loser re-reads the winner's row.
                if is_duplicate_key(&e) {
                    self.profiles()
                        .find_one(doc! { "_id": user_id })
                        .await
                        .context("Failed to re-read profile after insert race")?
                        .ok_or_else(|| anyhow::anyhow!("Profile vanished after insert race"))
                } else {
                    Err(e).context("Failed to create profile")
                }
            }
        }
    }

    pub async fn save(&self, profile: &mut Profile) -> Result<()> {
        profile.updated_at = Utc::now();

        let collection = self.profiles();
        retry_async_with_config(RetryConfig::default(), || async {
            collection
                .replace_one(doc! { "_id": &profile.user_id }, &*profile)
                .with_options(
                    mongodb::options::ReplaceOptions::builder()
                        .upsert(true)
                        .build(),
                )
                .await
                .map(|_| ())
        })
        .await
        .context("Failed to save profile")
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
        *e.kind
    {
        return we.code == 11000;
    }
    false
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Holiday calendar with a per-year cache.
//!
//! Other operators add and remove holidays while teachers are marking
//! attendance, so cached sets expire after a short TTL and every write made
//! through this service drops the affected year immediately. Each write
//! also bumps the year's generation so a load that started before it cannot
//! put the old set back.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::Holiday;
use crate::services::attendance_policy::{self, DateRejection};
use crate::time_utils::{format_date, now_rfc3339, parse_date};
use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CachedYear {
    dates: Arc<HashSet<NaiveDate>>,
    fetched_at: Instant,
}

pub struct HolidayService {
    db: FirestoreDb,
    cache: DashMap<i32, CachedYear>,
    generations: DashMap<i32, u64>,
    ttl: Duration,
}

impl HolidayService {
    pub fn new(db: FirestoreDb, ttl: Duration) -> Self {
        Self {
            db,
            cache: DashMap::new(),
            generations: DashMap::new(),
            ttl,
        }
    }

    /// Holiday dates for a calendar year, served from cache while fresh.
    pub async fn holidays_for_year(&self, year: i32) -> Result<Arc<HashSet<NaiveDate>>> {
        if let Some(entry) = self.cache.get(&year) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.dates.clone());
            }
        }
        self.refresh(year).await
    }

    /// Reload a year from the store, replacing any cached set.
    pub async fn refresh(&self, year: i32) -> Result<Arc<HashSet<NaiveDate>>> {
        let generation = self.generation(year);
        let dates: HashSet<NaiveDate> = self
            .db
            .list_holidays()
            .await?
            .iter()
            .filter_map(|h| parse_date(&h.date))
            .filter(|d| d.year() == year)
            .collect();

        tracing::debug!(year, count = dates.len(), "Holiday set refreshed");

        let dates = Arc::new(dates);
        if !self.store_if_current(year, generation, dates.clone()) {
            tracing::debug!(year, "Holiday set changed during refresh, not cached");
        }
        Ok(dates)
    }

    fn generation(&self, year: i32) -> u64 {
        self.generations.get(&year).map_or(0, |g| *g)
    }

    /// Cache `dates` unless the year was invalidated after `generation`
    /// was read.
    fn store_if_current(
        &self,
        year: i32,
        generation: u64,
        dates: Arc<HashSet<NaiveDate>>,
    ) -> bool {
        // The entry guard keeps invalidate() out until the insert is done
        let current = self.generations.entry(year).or_insert(0);
        if *current != generation {
            return false;
        }
        self.cache.insert(
            year,
            CachedYear {
                dates,
                fetched_at: Instant::now(),
            },
        );
        true
    }

    pub fn invalidate(&self, year: i32) {
        let mut generation = self.generations.entry(year).or_insert(0);
        *generation += 1;
        self.cache.remove(&year);
    }

    /// Eligibility of `date` for attendance entry, relative to `today`.
    ///
    /// `Ok(None)` means the date is allowed.
    pub async fn eligibility(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Option<DateRejection>> {
        let holidays = self.holidays_for_year(date.year()).await?;
        Ok(attendance_policy::check_date(date, today, &holidays).err())
    }

    /// Like [`Self::eligibility`], but a rejection becomes an error.
    pub async fn ensure_allowed(&self, date: NaiveDate, today: NaiveDate) -> Result<()> {
        match self.eligibility(date, today).await? {
            None => Ok(()),
            Some(rejection) => Err(AppError::DateNotAllowed(rejection)),
        }
    }

    /// Holidays in a year, ordered by date.
    pub async fn list_holidays(&self, year: i32) -> Result<Vec<Holiday>> {
        let mut holidays: Vec<Holiday> = self
            .db
            .list_holidays()
            .await?
            .into_iter()
            .filter(|h| parse_date(&h.date).is_some_and(|d| d.year() == year))
            .collect();
        holidays.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(holidays)
    }

    pub async fn add_holiday(&self, mut holiday: Holiday, created_by: &str) -> Result<Holiday> {
        let date = parse_date(&holiday.date).ok_or_else(|| {
            AppError::BadRequest("Holiday date must be YYYY-MM-DD".to_string())
        })?;

        holiday.date = format_date(date);
        holiday.created_by = Some(created_by.to_string());
        holiday.created_at = Some(now_rfc3339());
        self.db.set_holiday(&holiday).await?;
        self.invalidate(date.year());

        tracing::info!(date = %holiday.date, name = %holiday.name, "Holiday added");
        Ok(holiday)
    }

    pub async fn remove_holiday(&self, raw_date: &str) -> Result<()> {
        let date = parse_date(raw_date).ok_or_else(|| {
            AppError::BadRequest("Holiday date must be YYYY-MM-DD".to_string())
        })?;

        self.db.delete_holiday(&format_date(date)).await?;
        self.invalidate(date.year());

        tracing::info!(date = %date, "Holiday removed");
        Ok(())
    }
}

//! Utilitários de data
//!
//! Normalização da data de nascimento digitada (DD/MM/AAAA), formatação
//! curta para exibição e cálculo de idade.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};

use crate::error::ValidationError;

/// Menor ano de nascimento aceito
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// Idioma das abreviações de mês
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthLocale {
    #[default]
    Es,
    En,
}

impl MonthLocale {
    fn months(self) -> [&'static str; 12] {
        match self {
            MonthLocale::Es => [
                "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
            ],
            MonthLocale::En => [
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ],
        }
    }

    /// Abreviação de três letras do mês (1-12)
    pub fn month_abbrev(self, month: u32) -> &'static str {
        self.months()[(month.clamp(1, 12) - 1) as usize]
    }
}

/// Dia, mês e ano extraídos da entrada, já validados por faixa
fn split_digits(input: &str, today: NaiveDate) -> Result<(u32, u32, i32), ValidationError> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(ValidationError::InvalidDateFormat);
    }

    let day: u32 = digits[0..2].parse().map_err(|_| ValidationError::InvalidDateFormat)?;
    let month: u32 = digits[2..4].parse().map_err(|_| ValidationError::InvalidDateFormat)?;
    let year: i32 = digits[4..8].parse().map_err(|_| ValidationError::InvalidDateFormat)?;

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(ValidationError::InvalidDateFormat);
    }
    if year < MIN_BIRTH_YEAR || year > today.year() {
        return Err(ValidationError::InvalidDateFormat);
    }

    Ok((day, month, year))
}

/// Converte uma data digitada em `YYYY-MM-DD` usando a data local de hoje
pub fn parse_date(input: &str) -> Result<String, ValidationError> {
    parse_date_on(input, Local::now().date_naive())
}

/// Converte uma data digitada em `YYYY-MM-DD`
///
/// Remove tudo que não for dígito e exige exatamente oito dígitos
/// (DDMMAAAA). Dia e mês são verificados apenas por faixa: 31/02 passa.
pub fn parse_date_on(input: &str, today: NaiveDate) -> Result<String, ValidationError> {
    let (day, month, year) = split_digits(input, today)?;
    Ok(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// Como [`parse_date_on`], mas exige uma data que exista no calendário
pub fn parse_calendar_date_on(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let (day, month, year) = split_digits(input, today)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(ValidationError::InvalidDateFormat)
}

/// Formata uma data como "15 Mar 2024"
pub fn format_date<D: Datelike>(date: &D, locale: MonthLocale) -> String {
    format!(
        "{} {} {}",
        date.day(),
        locale.month_abbrev(date.month()),
        date.year()
    )
}

/// Formata um instante usando a data no relógio local
pub fn format_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>, locale: MonthLocale) -> String {
    format_date(&ts.with_timezone(&Local).date_naive(), locale)
}

/// Idade em anos completos na data `today`
pub fn compute_age(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Idade a partir da data persistida (`YYYY-MM-DD`)
pub fn age_from_str(birth: &str, today: NaiveDate) -> Option<u32> {
    NaiveDate::parse_from_str(birth.trim(), "%Y-%m-%d")
        .ok()
        .map(|b| compute_age(b, today))
}

use chrono::{Days, NaiveDate};
use std::fmt;

/// Coloured-belt grades, from white (10th gup) up to red with black tip
/// (1st gup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gup {
    Blanco10,
    PuntaAmarilla9,
    Amarillo8,
    AmarilloPuntaVerde7,
    Verde6,
    VerdePuntaAzul5,
    Azul4,
    AzulPuntaRoja3,
    Rojo2,
    RojoPuntaNegra1,
}

impl Gup {
    /// Every grade in exam order.
    pub const ALL: [Gup; 10] = [
        Gup::Blanco10,
        Gup::PuntaAmarilla9,
        Gup::Amarillo8,
        Gup::AmarilloPuntaVerde7,
        Gup::Verde6,
        Gup::VerdePuntaAzul5,
        Gup::Azul4,
        Gup::AzulPuntaRoja3,
        Gup::Rojo2,
        Gup::RojoPuntaNegra1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gup::Blanco10 => "BLANCO_10",
            Gup::PuntaAmarilla9 => "PUNTA_AMARILLA_9",
            Gup::Amarillo8 => "AMARILLO_8",
            Gup::AmarilloPuntaVerde7 => "AMARILLO_PUNTA_VERDE_7",
            Gup::Verde6 => "VERDE_6",
            Gup::VerdePuntaAzul5 => "VERDE_PUNTA_AZUL_5",
            Gup::Azul4 => "AZUL_4",
            Gup::AzulPuntaRoja3 => "AZUL_PUNTA_ROJA_3",
            Gup::Rojo2 => "ROJO_2",
            Gup::RojoPuntaNegra1 => "ROJO_PUNTA_NEGRA_1",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gup::Blanco10 => "Blanco",
            Gup::PuntaAmarilla9 => "Punta Amarilla",
            Gup::Amarillo8 => "Amarillo",
            Gup::AmarilloPuntaVerde7 => "Amarillo Punta Verde",
            Gup::Verde6 => "Verde",
            Gup::VerdePuntaAzul5 => "Verde Punta Azul",
            Gup::Azul4 => "Azul",
            Gup::AzulPuntaRoja3 => "Azul Punta Roja",
            Gup::Rojo2 => "Rojo",
            Gup::RojoPuntaNegra1 => "Rojo Punta Negra",
        }
    }

    /// 10 for white down to 1 for the last coloured belt.
    pub fn level(&self) -> u8 {
        10 - Self::ALL.iter().position(|g| g == self).unwrap_or(0) as u8
    }

    pub fn next(&self) -> Option<Gup> {
        let index = Self::ALL.iter().position(|g| g == self)?;
        Self::ALL.get(index + 1).copied()
    }

    pub fn min_days_between_exams(&self) -> u64 {
        match self {
            Gup::Blanco10 | Gup::PuntaAmarilla9 | Gup::Amarillo8 | Gup::AmarilloPuntaVerde7 => 60,
            Gup::Verde6 | Gup::VerdePuntaAzul5 | Gup::Azul4 => 90,
            Gup::AzulPuntaRoja3 | Gup::Rojo2 => 120,
            Gup::RojoPuntaNegra1 => 180,
        }
    }

    /// The roster label, e.g. `Blanco (10)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name(), self.level())
    }

    /// Accepts a grade code (`VERDE_6`) or a roster label (`Verde (6)`),
    /// ignoring case and surrounding whitespace.
    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|g| {
            g.as_str().eq_ignore_ascii_case(value) || g.label().eq_ignore_ascii_case(value)
        })
    }

    /// Earliest date for the next exam, or `None` at the top grade.
    pub fn next_exam_date(&self, last_exam: NaiveDate) -> Option<NaiveDate> {
        self.next()?;
        last_exam.checked_add_days(Days::new(self.min_days_between_exams()))
    }

    pub fn is_ready_for_exam(&self, last_exam: NaiveDate, today: NaiveDate) -> bool {
        self.next_exam_date(last_exam)
            .is_some_and(|suggested| today >= suggested)
    }
}

impl fmt::Display for Gup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Basic DNI shape check: seven or eight ASCII digits.
pub fn is_valid_dni(dni: &str) -> bool {
    (7..=8).contains(&dni.len()) && dni.bytes().all(|b| b.is_ascii_digit())
}

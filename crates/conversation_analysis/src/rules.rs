//! Keyword tables. Every table is matched by substring against the
//! lowercased transcript; ordered tables are first-match-wins.

use crate::{Action, ProblemType, ResolutionStatus, Urgency};

pub(crate) type Rule<T> = (&'static [&'static str], T);
pub(crate) type PairRule<T> = (&'static [&'static str], &'static [&'static str], T);

/// Slowness is checked before the connectivity group: a slow line usually
/// also mentions the modem lights.
pub(crate) const PROBLEM_RULES: &[Rule<ProblemType>] = &[
    (
        &["lentitud", "lento", "lenta", "velocidad baja", "tarda mucho"],
        ProblemType::LentitudServicio,
    ),
    (
        &[
            "sin servicio",
            "sin internet",
            "no tengo internet",
            "no hay internet",
            "no funciona",
        ],
        ProblemType::FaltaServicio,
    ),
    (
        &["intermitente", "se corta", "se desconecta", "va y viene"],
        ProblemType::ServicioIntermitente,
    ),
    (
        &[
            "luz naranja",
            "luz roja",
            "red es baja",
            "señal",
            "conexión",
            "conexion",
            "wifi",
            "router",
            "módem",
            "modem",
        ],
        ProblemType::ProblemaConectividad,
    ),
];

pub(crate) const URGENCY_RULES: &[Rule<Urgency>] = &[
    (
        &[
            "urgente",
            "emergencia",
            "inmediatamente",
            "lo antes posible",
            "cuanto antes",
        ],
        Urgency::High,
    ),
    (
        &[
            "varios aparatos",
            "varios dispositivos",
            "conectados a la vez",
            "trabajando",
            "trabajo",
            "home office",
        ],
        Urgency::Medium,
    ),
    (
        &["cuando pueda", "no hay prisa", "sin prisa", "puede esperar"],
        Urgency::Low,
    ),
];

pub(crate) const NEGATIVE_WORDS: &[&str] = &[
    "molesto",
    "molesta",
    "enojado",
    "enojada",
    "frustrado",
    "frustrada",
    "pésimo",
    "pesimo",
    "terrible",
    "harto",
    "harta",
    "muy lento",
    "no sirve",
    "queja",
];

pub(crate) const POSITIVE_WORDS: &[&str] = &[
    "gracias",
    "excelente",
    "perfecto",
    "muy bien",
    "me parece bien",
    "amable",
    "agradezco",
    "con gusto",
];

pub(crate) const NEUTRAL_WORDS: &[&str] = &["okay", "de acuerdo", "entiendo", "está bien", "más o menos"];

const ADJUSTMENT_WORDS: &[&str] = &["ajuste", "ajustando"];

pub(crate) const RESOLUTION_RULES: &[PairRule<ResolutionStatus>] = &[
    (
        ADJUSTMENT_WORDS,
        &["realizó", "realizado", "realizados", "realizaron", "realizando"],
        ResolutionStatus::PotentiallyResolved,
    ),
    (
        &["devuelvo", "devolvamos", "devuelva", "devolver", "devolvería"],
        &["llamada"],
        ResolutionStatus::PendingVerification,
    ),
    (
        &["técnico", "tecnico"],
        &["visita", "venir", "arreglar", "reparar", "domicilio"],
        ResolutionStatus::RequiresTechnician,
    ),
];

pub(crate) const FOLLOW_UP_PHRASES: &[&str] = &[
    "devuelvo la llamada",
    "devolvamos la llamada",
    "devuelva la llamada",
    "devolver la llamada",
    "le marco",
    "le llamo más tarde",
    "se los hago saber",
    "dar seguimiento",
    "callback",
];

pub(crate) const ESTIMATED_TIME_RULES: &[Rule<&str>] = &[
    (&["media hora"], "30_minutos"),
    (&["una hora"], "60_minutos"),
    (&["mañana temprano", "el día de mañana"], "siguiente_dia"),
];

pub(crate) const SPECIFIC_PROBLEM_RULES: &[Rule<&str>] = &[
    (&["luz naranja", "red es baja"], "indicador_conexion_baja"),
    (&["luz roja", "sin señal"], "indicador_sin_conexion"),
    (&["contraseña", "clave del wifi"], "credenciales_red"),
];

pub(crate) const SERVICE_STATE_RULES: &[Rule<&str>] = &[
    (
        &["más estable", "mas estable", "más correctos"],
        "estable_tras_ajustes",
    ),
    (&["no funciona", "sin servicio", "sin internet"], "sin_servicio"),
    (&["intermitente", "se corta", "se desconecta"], "intermitente"),
    (&["muy lento", "lentitud"], "degradado"),
];

pub(crate) const LOCATION_RULES: &[Rule<&str>] = &[
    (
        &["no estoy en mi casa", "no estoy en casa", "fuera de casa"],
        "fuera_de_casa",
    ),
    (&["estoy en mi casa", "estoy en casa"], "en_casa"),
    (&["en el trabajo", "estaba trabajando", "estoy trabajando"], "en_trabajo"),
];

/// Each trigger fires independently and appends its actions in order, so
/// the same action can appear more than once.
pub(crate) const ACTION_RULES: &[Rule<&[Action]>] = &[
    (
        &[
            "devuelvo la llamada",
            "devolvamos la llamada",
            "devuelva la llamada",
            "devolver la llamada",
            "callback",
        ],
        &[Action::ProgramarCallback],
    ),
    (ADJUSTMENT_WORDS, &[Action::VerificarAjustesRealizados]),
    (
        &["luz naranja", "luz roja", "red es baja", "sin señal", "señal baja"],
        &[Action::RevisarNivelesSenal, Action::DiagnosticoRemoto],
    ),
    (
        &["varios aparatos", "varios dispositivos", "conectados a la vez"],
        &[Action::OptimizarAnchoBanda],
    ),
    (
        &[
            "visita técnica",
            "visita tecnica",
            "venir un técnico",
            "venir un tecnico",
            "mandar un técnico",
            "mandar un tecnico",
            "enviar un técnico",
            "enviar un tecnico",
        ],
        &[Action::ProgramarVisitaTecnica],
    ),
    (&["lentitud", "lento", "lenta"], &[Action::MonitoreoVelocidad]),
    (
        &[
            "router",
            "módem",
            "modem",
            "configuración",
            "configuracion",
            "contraseña",
        ],
        &[Action::VerificarConfiguracion],
    ),
    (
        &["intermitente", "se corta", "se desconecta"],
        &[Action::DiagnosticoRemoto],
    ),
];

pub(crate) const SUMMARY_PROBLEM_WORDS: &[&str] = &[
    "lentitud",
    "lento",
    "problema",
    "falla",
    "no funciona",
    "sin servicio",
    "intermitente",
];

pub(crate) const SUMMARY_ADJUSTMENT_WORDS: &[&str] = ADJUSTMENT_WORDS;

pub(crate) const SUMMARY_CALLBACK_WORDS: &[&str] = &[
    "devuelvo la llamada",
    "devolvamos la llamada",
    "devuelva la llamada",
    "devolver la llamada",
    "callback",
];

pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Number of distinct keywords present, not number of occurrences.
pub(crate) fn count_matches(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|keyword| text.contains(**keyword)).count()
}

pub(crate) fn first_match<T: Copy>(text: &str, rules: &[Rule<T>]) -> Option<T> {
    rules
        .iter()
        .find(|(keywords, _)| contains_any(text, keywords))
        .map(|(_, result)| *result)
}

pub(crate) fn first_pair_match<T: Copy>(text: &str, rules: &[PairRule<T>]) -> Option<T> {
    rules
        .iter()
        .find(|(left, right, _)| contains_any(text, left) && contains_any(text, right))
        .map(|(_, _, result)| *result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_respects_table_order() {
        let rules: &[Rule<u8>] = &[(&["a"], 1), (&["b"], 2)];

        assert_eq!(first_match("b a", rules), Some(1));
        assert_eq!(first_match("b", rules), Some(2));
        assert_eq!(first_match("c", rules), None);
    }

    #[test]
    fn pair_rule_needs_both_sides() {
        let rules: &[PairRule<u8>] = &[(&["x"], &["y"], 1)];

        assert_eq!(first_pair_match("x", rules), None);
        assert_eq!(first_pair_match("y x", rules), Some(1));
    }

    #[test]
    fn count_matches_counts_each_keyword_once() {
        assert_eq!(count_matches("gracias, gracias, gracias", &["gracias", "amable"]), 1);
    }

    #[test]
    fn slow_line_with_modem_light_is_slowness() {
        assert_eq!(
            first_match("está lento y tiene la luz naranja", PROBLEM_RULES),
            Some(ProblemType::LentitudServicio)
        );
    }
}

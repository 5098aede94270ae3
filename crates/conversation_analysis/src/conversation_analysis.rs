//! Rule-based triage of support call transcripts.
//!
//! Every classifier is a pure, total function of the transcript: input is
//! lowercased, matched by substring against fixed keyword tables, and a
//! default is returned when nothing matches. Nothing is stored between
//! calls.

mod entities;
mod rules;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::rules::{
    ACTION_RULES, FOLLOW_UP_PHRASES, NEGATIVE_WORDS, NEUTRAL_WORDS, POSITIVE_WORDS,
    PROBLEM_RULES, RESOLUTION_RULES, SUMMARY_ADJUSTMENT_WORDS, SUMMARY_CALLBACK_WORDS,
    SUMMARY_PROBLEM_WORDS, URGENCY_RULES, contains_any, count_matches, first_match,
    first_pair_match,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    LentitudServicio,
    FaltaServicio,
    ServicioIntermitente,
    ProblemaConectividad,
    ProblemaGeneral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Frustrated,
    Satisfied,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    PotentiallyResolved,
    PendingVerification,
    RequiresTechnician,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ProgramarCallback,
    VerificarAjustesRealizados,
    #[serde(rename = "revisar_niveles_señal")]
    RevisarNivelesSenal,
    DiagnosticoRemoto,
    OptimizarAnchoBanda,
    ProgramarVisitaTecnica,
    MonitoreoVelocidad,
    VerificarConfiguracion,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ProgramarCallback => "programar_callback",
            Action::VerificarAjustesRealizados => "verificar_ajustes_realizados",
            Action::RevisarNivelesSenal => "revisar_niveles_señal",
            Action::DiagnosticoRemoto => "diagnostico_remoto",
            Action::OptimizarAnchoBanda => "optimizar_ancho_banda",
            Action::ProgramarVisitaTecnica => "programar_visita_tecnica",
            Action::MonitoreoVelocidad => "monitoreo_velocidad",
            Action::VerificarConfiguracion => "verificar_configuracion",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub tiempo_estimado: Option<String>,
    pub hora_callback: Option<String>,
    pub problema_especifico: Option<String>,
    pub estado_servicio: Option<String>,
    pub ajustes_realizados: bool,
    pub ubicacion_cliente: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAnalysis {
    pub problem_type: ProblemType,
    pub urgency_level: Urgency,
    pub customer_sentiment: Sentiment,
    pub resolution_status: ResolutionStatus,
    pub follow_up_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAnalysis {
    pub call_analysis: CallAnalysis,
    pub extracted_entities: ExtractedEntities,
    pub recommended_actions: Vec<Action>,
    pub summary: String,
}

/// Caller-side context for a call. Only carried through; it never changes
/// the classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMetadata {
    pub operator_id: i64,
    pub client_ref: String,
    #[serde(default)]
    pub call_date: Option<NaiveDate>,
    #[serde(default)]
    pub call_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedCall {
    pub call_id: String,
    pub metadata: CallMetadata,
    pub analysis: ConversationAnalysis,
}

pub fn classify_problem_type(text: &str) -> ProblemType {
    first_match(&text.to_lowercase(), PROBLEM_RULES).unwrap_or(ProblemType::ProblemaGeneral)
}

pub fn classify_urgency(text: &str) -> Urgency {
    first_match(&text.to_lowercase(), URGENCY_RULES).unwrap_or(Urgency::Medium)
}

/// `Frustrated` only when negatives outweigh positives and neutrals
/// together; `Satisfied` only on a strict positive majority over negatives.
pub fn classify_sentiment(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let negative = count_matches(&text, NEGATIVE_WORDS);
    let positive = count_matches(&text, POSITIVE_WORDS);
    let neutral = count_matches(&text, NEUTRAL_WORDS);

    if negative > positive + neutral {
        Sentiment::Frustrated
    } else if positive > negative {
        Sentiment::Satisfied
    } else {
        Sentiment::Neutral
    }
}

pub fn classify_resolution_status(text: &str) -> ResolutionStatus {
    first_pair_match(&text.to_lowercase(), RESOLUTION_RULES).unwrap_or(ResolutionStatus::Unresolved)
}

pub fn needs_follow_up(text: &str) -> bool {
    contains_any(&text.to_lowercase(), FOLLOW_UP_PHRASES)
}

pub fn extract_entities(text: &str) -> ExtractedEntities {
    entities::extract(&text.to_lowercase())
}

pub fn recommend_actions(text: &str) -> Vec<Action> {
    let text = text.to_lowercase();
    ACTION_RULES
        .iter()
        .filter(|(keywords, _)| contains_any(&text, keywords))
        .flat_map(|(_, actions)| actions.iter().copied())
        .collect()
}

pub fn summarize(text: &str) -> String {
    let text = text.to_lowercase();
    let mut summary = Vec::with_capacity(3);

    summary.push(if contains_any(&text, SUMMARY_PROBLEM_WORDS) {
        "Cliente reporta un problema con su servicio."
    } else {
        "Cliente se comunica sin reportar un problema específico."
    });
    summary.push(if contains_any(&text, SUMMARY_ADJUSTMENT_WORDS) {
        "Se realizaron ajustes en el servicio y el cliente debe verificar su funcionamiento."
    } else {
        "No se registraron ajustes en el servicio."
    });
    summary.push(if contains_any(&text, SUMMARY_CALLBACK_WORDS) {
        "Se acordó devolver la llamada para confirmar la resolución."
    } else {
        "No se programó una devolución de llamada."
    });

    summary.join(" ")
}

/// Runs every classifier over one transcript.
pub fn analyze_transcript(text: &str) -> ConversationAnalysis {
    ConversationAnalysis {
        call_analysis: CallAnalysis {
            problem_type: classify_problem_type(text),
            urgency_level: classify_urgency(text),
            customer_sentiment: classify_sentiment(text),
            resolution_status: classify_resolution_status(text),
            follow_up_required: needs_follow_up(text),
        },
        extracted_entities: extract_entities(text),
        recommended_actions: recommend_actions(text),
        summary: summarize(text),
    }
}

/// Classifies a transcript and tags it with a fresh call id.
pub fn analyze(transcript: &str, metadata: CallMetadata) -> AnalyzedCall {
    log::debug!(
        "Analyzing call for operator {} and client {}",
        metadata.operator_id,
        metadata.client_ref
    );

    AnalyzedCall {
        call_id: call_id_at(chrono::Local::now().naive_local()),
        metadata,
        analysis: analyze_transcript(transcript),
    }
}

/// Second resolution: two calls analyzed within the same second share an id.
pub fn call_id_at(at: NaiveDateTime) -> String {
    format!("CALL-{}", at.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_takes_every_default() {
        let analysis = analyze_transcript("");

        assert_eq!(analysis.call_analysis.problem_type, ProblemType::ProblemaGeneral);
        assert_eq!(analysis.call_analysis.urgency_level, Urgency::Medium);
        assert_eq!(analysis.call_analysis.customer_sentiment, Sentiment::Neutral);
        assert_eq!(analysis.call_analysis.resolution_status, ResolutionStatus::Unresolved);
        assert!(!analysis.call_analysis.follow_up_required);
        assert_eq!(analysis.extracted_entities, ExtractedEntities::default());
        assert!(analysis.recommended_actions.is_empty());
    }

    #[test]
    fn problem_type_groups() {
        assert_eq!(classify_problem_type("NO FUNCIONA nada"), ProblemType::FaltaServicio);
        assert_eq!(classify_problem_type("la señal va y viene"), ProblemType::ServicioIntermitente);
        assert_eq!(classify_problem_type("el router parpadea"), ProblemType::ProblemaConectividad);
        assert_eq!(classify_problem_type("quiero cambiar de plan"), ProblemType::ProblemaGeneral);
    }

    #[test]
    fn urgency_order() {
        assert_eq!(classify_urgency("es urgente, estoy trabajando"), Urgency::High);
        assert_eq!(classify_urgency("lo uso para el trabajo"), Urgency::Medium);
        assert_eq!(classify_urgency("revíselo cuando pueda"), Urgency::Low);
        assert_eq!(classify_urgency("hola"), Urgency::Medium);
    }

    #[test]
    fn sentiment_tie_is_neutral() {
        assert_eq!(classify_sentiment("estoy molesto, gracias"), Sentiment::Neutral);
    }

    #[test]
    fn sentiment_strict_majorities() {
        assert_eq!(classify_sentiment("gracias, excelente, pero estoy molesto"), Sentiment::Satisfied);
        assert_eq!(classify_sentiment("estoy harto, es terrible"), Sentiment::Frustrated);
        assert_eq!(classify_sentiment("estoy harto, okay, gracias"), Sentiment::Neutral);
        assert_eq!(classify_sentiment("estoy harto y molesto, okay, gracias"), Sentiment::Neutral);
        assert_eq!(
            classify_sentiment("estoy harto, molesto y enojado, okay, gracias"),
            Sentiment::Frustrated
        );
    }

    #[test]
    fn resolution_pairs_in_order() {
        assert_eq!(
            classify_resolution_status("se realizó un ajuste y le devuelvo la llamada"),
            ResolutionStatus::PotentiallyResolved
        );
        assert_eq!(
            classify_resolution_status("le devuelvo la llamada mañana"),
            ResolutionStatus::PendingVerification
        );
        assert_eq!(
            classify_resolution_status("tiene que venir un técnico"),
            ResolutionStatus::RequiresTechnician
        );
        assert_eq!(classify_resolution_status("hicimos un ajuste"), ResolutionStatus::Unresolved);
    }

    #[test]
    fn follow_up_phrases() {
        assert!(needs_follow_up("Le devuelvo la llamada en media hora"));
        assert!(needs_follow_up("si sigue igual se los hago saber"));
        assert!(!needs_follow_up("todo quedó resuelto"));
    }

    #[test]
    fn actions_keep_check_order_and_duplicates() {
        assert_eq!(
            recommend_actions("hay luz roja y la conexión se corta"),
            vec![
                Action::RevisarNivelesSenal,
                Action::DiagnosticoRemoto,
                Action::DiagnosticoRemoto,
            ]
        );
        assert_eq!(
            recommend_actions("revise el módem, tengo varios dispositivos"),
            vec![Action::OptimizarAnchoBanda, Action::VerificarConfiguracion]
        );
    }

    #[test]
    fn summary_reflects_three_flags() {
        assert_eq!(
            summarize(""),
            "Cliente se comunica sin reportar un problema específico. \
             No se registraron ajustes en el servicio. \
             No se programó una devolución de llamada."
        );

        let summary = summarize("Lentitud. Un ajuste. Le devuelvo la llamada.");
        assert!(summary.starts_with("Cliente reporta un problema con su servicio."));
        assert!(summary.contains("Se realizaron ajustes"));
        assert!(summary.ends_with("Se acordó devolver la llamada para confirmar la resolución."));
    }

    #[test]
    fn call_id_is_time_derived() {
        let at = NaiveDate::from_ymd_opt(2024, 12, 1)
            .unwrap()
            .and_hms_opt(0, 10, 1)
            .unwrap();
        assert_eq!(call_id_at(at), "CALL-20241201001001");
    }

    #[test]
    fn analyze_carries_metadata_without_using_it() {
        let metadata = CallMetadata {
            operator_id: 1,
            client_ref: "X".into(),
            ..Default::default()
        };
        let call = analyze("", metadata.clone());

        assert!(call.call_id.starts_with("CALL-"));
        assert_eq!(call.metadata, metadata);
        assert_eq!(call.analysis, analyze_transcript(""));
    }

    #[test]
    fn action_serializes_with_tilde() {
        assert_eq!(Action::RevisarNivelesSenal.as_str(), "revisar_niveles_señal");
        assert_eq!(Action::OptimizarAnchoBanda.to_string(), "optimizar_ancho_banda");
    }
}

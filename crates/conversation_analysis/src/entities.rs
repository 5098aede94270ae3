use crate::{
    ExtractedEntities,
    rules::{
        ESTIMATED_TIME_RULES, LOCATION_RULES, SERVICE_STATE_RULES, SPECIFIC_PROBLEM_RULES,
        SUMMARY_ADJUSTMENT_WORDS, contains_any, first_match,
    },
};

const HOUR_WORDS: &[(&str, u32)] = &[
    ("una", 1),
    ("uno", 1),
    ("dos", 2),
    ("tres", 3),
    ("cuatro", 4),
    ("cinco", 5),
    ("seis", 6),
    ("siete", 7),
    ("ocho", 8),
    ("nueve", 9),
    ("diez", 10),
    ("once", 11),
    ("doce", 12),
];

const EVENING_WORDS: &[&str] = &["noche", "tarde"];

/// Expects lowercased text.
pub(crate) fn extract(text: &str) -> ExtractedEntities {
    ExtractedEntities {
        tiempo_estimado: first_match(text, ESTIMATED_TIME_RULES).map(str::to_owned),
        hora_callback: callback_hour(text),
        problema_especifico: first_match(text, SPECIFIC_PROBLEM_RULES).map(str::to_owned),
        estado_servicio: first_match(text, SERVICE_STATE_RULES).map(str::to_owned),
        ajustes_realizados: contains_any(text, SUMMARY_ADJUSTMENT_WORDS),
        ubicacion_cliente: first_match(text, LOCATION_RULES).map(str::to_owned),
    }
}

/// First spoken hour of the form "a las nueve" / "a la una" / "a las 9",
/// moved past noon when the call talks about the afternoon or night.
fn callback_hour(text: &str) -> Option<String> {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    let hour = words.windows(3).find_map(|window| match window {
        ["a", "las" | "la", hour] => parse_hour(hour),
        _ => None,
    })?;

    let hour = if hour < 12 && contains_any(text, EVENING_WORDS) {
        hour + 12
    } else {
        hour
    };

    Some(format!("{:02}:00", hour))
}

fn parse_hour(word: &str) -> Option<u32> {
    if let Ok(hour) = word.parse::<u32>() {
        return (1..=24).contains(&hour).then_some(hour % 24);
    }

    HOUR_WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, hour)| *hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spoken_hour_at_night_is_shifted() {
        assert_eq!(
            callback_hour("me parece bien, a las nueve de la noche").as_deref(),
            Some("21:00")
        );
    }

    #[test]
    fn morning_hour_is_kept() {
        assert_eq!(
            callback_hour("llámeme a las diez de la mañana").as_deref(),
            Some("10:00")
        );
    }

    #[test]
    fn digits_and_singular_article() {
        assert_eq!(callback_hour("a las 8").as_deref(), Some("08:00"));
        assert_eq!(callback_hour("a la una por la tarde").as_deref(), Some("13:00"));
        assert_eq!(callback_hour("a las 24").as_deref(), Some("00:00"));
        assert_eq!(callback_hour("a las 30"), None);
    }

    #[test]
    fn hasta_las_is_not_a_callback_hour() {
        assert_eq!(callback_hour("atendemos hasta las diez de la noche"), None);
    }

    #[test]
    fn empty_text_has_default_entities() {
        assert_eq!(extract(""), ExtractedEntities::default());
    }

    #[test]
    fn fields_are_independent() {
        let entities = extract("hay una luz naranja, ya hicimos un ajuste, estoy en casa");

        assert_eq!(entities.problema_especifico.as_deref(), Some("indicador_conexion_baja"));
        assert!(entities.ajustes_realizados);
        assert_eq!(entities.ubicacion_cliente.as_deref(), Some("en_casa"));
        assert_eq!(entities.tiempo_estimado, None);
        assert_eq!(entities.hora_callback, None);
    }
}

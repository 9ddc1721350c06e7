use crate::error::*;
use crate::template::*;
use rand::Rng;

/// Check that a variant table is non-empty and its probabilities sum to 1.
pub fn validate_weights(
    room_type: &RoomType,
    variants: &[WeightedVariant],
    epsilon: f32,
) -> GenerationResult<()> {
    if variants.is_empty() {
        return Err(GenerationError::MissingVariants(room_type.clone()));
    }
    let sum: f32 = variants.iter().map(|v| v.probability).sum();
    if (sum - 1.0).abs() > epsilon {
        return Err(GenerationError::ProbabilitySum {
            room_type: room_type.clone(),
            sum,
        });
    }
    Ok(())
}

/// Walk the table accumulating probability mass and return the first variant
/// whose cumulative mass reaches `draw`. Rounding drift falls through to the
/// last variant. Callers validate the table first.
pub fn pick_variant(variants: &[WeightedVariant], draw: f32) -> Option<&WeightedVariant> {
    let mut cumulative = 0.0f32;
    for variant in variants {
        cumulative += variant.probability;
        if cumulative >= draw {
            return Some(variant);
        }
    }
    variants.last()
}

/// Picks a template variant for a room type by probability.
pub struct RoomTemplateSelector<'a> {
    catalog: &'a TemplateCatalog,
    epsilon: f32,
}

impl<'a> RoomTemplateSelector<'a> {
    pub fn new(catalog: &'a TemplateCatalog, epsilon: f32) -> Self {
        RoomTemplateSelector { catalog, epsilon }
    }

    pub fn select<R: Rng>(
        &self,
        room_type: &RoomType,
        rng: &mut R,
    ) -> GenerationResult<&'a RoomTemplate> {
        let variants = self
            .catalog
            .variants(room_type)
            .ok_or_else(|| GenerationError::MissingVariants(room_type.clone()))?;
        validate_weights(room_type, variants, self.epsilon)?;

        let draw: f32 = rng.gen();
        let variant = pick_variant(variants, draw)
            .ok_or_else(|| GenerationError::MissingVariants(room_type.clone()))?;

        self.catalog
            .template(&variant.template)
            .ok_or_else(|| GenerationError::UnknownTemplate(variant.template.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirectionSet;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table() -> Vec<WeightedVariant> {
        vec![WeightedVariant::new("a", 0.7), WeightedVariant::new("b", 0.3)]
    }

    #[test]
    fn cumulative_walk_picks_by_mass() {
        let t = table();
        assert_eq!(pick_variant(&t, 0.0).unwrap().template, "a");
        assert_eq!(pick_variant(&t, 0.69).unwrap().template, "a");
        assert_eq!(pick_variant(&t, 0.71).unwrap().template, "b");
    }

    #[test]
    fn drift_falls_back_to_last_variant() {
        let t = vec![WeightedVariant::new("a", 0.5), WeightedVariant::new("b", 0.4999)];
        assert_eq!(pick_variant(&t, 0.99995).unwrap().template, "b");
        assert!(pick_variant(&[], 0.5).is_none());
    }

    #[test]
    fn weight_sum_outside_epsilon_is_an_error() {
        let rt = RoomType::from("hall");
        assert!(validate_weights(&rt, &table(), 0.001).is_ok());
        let off = vec![WeightedVariant::new("a", 0.7), WeightedVariant::new("b", 0.2)];
        assert!(matches!(
            validate_weights(&rt, &off, 0.001),
            Err(GenerationError::ProbabilitySum { .. })
        ));
        assert!(matches!(
            validate_weights(&rt, &[], 0.001),
            Err(GenerationError::MissingVariants(_))
        ));
    }

    #[test]
    fn empirical_frequency_converges() {
        let catalog = TemplateCatalog::new("hall")
            .with_template(RoomTemplate::square("a", "hall", 4.0, DirectionSet::NORTH))
            .with_template(RoomTemplate::square("b", "hall", 4.0, DirectionSet::SOUTH))
            .with_variant("hall", WeightedVariant::new("a", 0.7))
            .with_variant("hall", WeightedVariant::new("b", 0.3));
        let selector = RoomTemplateSelector::new(&catalog, 0.001);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rt = RoomType::from("hall");

        let draws = 20_000;
        let hits = (0..draws)
            .filter(|_| selector.select(&rt, &mut rng).unwrap().name == "a")
            .count();
        let freq = hits as f32 / draws as f32;
        assert!((freq - 0.7).abs() < 0.02, "frequency of a was {freq}");
    }

    #[test]
    fn unknown_room_type_fails_selection() {
        let catalog = TemplateCatalog::new("hall");
        let selector = RoomTemplateSelector::new(&catalog, 0.001);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(selector.select(&RoomType::from("vault"), &mut rng).is_err());
    }
}

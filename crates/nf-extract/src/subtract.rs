//! Background subtraction.

use nf_core::Result;
use nf_hist::Hist1D;

/// Remove luminosity-scaled background templates from an observed spectrum.
///
/// The templates are first summed elementwise — central values together,
/// and independently band X universe i with band X universe i — then the
/// total is scaled by `data_pot / mc_pot` and subtracted bin-by-bin from
/// `folded`. The result keeps `folded`'s full band and universe structure.
///
/// Every background must already share `folded`'s bands (synchronize
/// first); a leftover mismatch is a fatal error for the current prefix.
pub fn subtract_backgrounds(
    folded: &Hist1D,
    backgrounds: &[Hist1D],
    data_pot: f64,
    mc_pot: f64,
) -> Result<Hist1D> {
    let mut templates = backgrounds.iter();
    let total = match templates.next() {
        None => return Ok(folded.clone()),
        Some(first) => {
            let mut total = first.clone();
            for bkg in templates {
                total = total.add(bkg)?;
            }
            total
        }
    };

    folded.subtract_scaled(&total, data_pot / mc_pot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_hist::ErrorBand;

    fn hist(name: &str, cv: &[f64]) -> Hist1D {
        let edges: Vec<f64> = (0..=cv.len()).map(|i| i as f64).collect();
        Hist1D::with_contents(name, &edges, cv.to_vec(), vec![0.0; cv.len()]).unwrap()
    }

    #[test]
    fn scales_by_the_exposure_ratio() {
        let folded = hist("folded", &[10.0, 20.0, 10.0]);
        let bkg = hist("bkg", &[2.0, 4.0, 2.0]);

        let result = subtract_backgrounds(&folded, &[bkg], 1.0e19, 2.0e19).unwrap();
        assert_eq!(result.cv(), &[9.0, 18.0, 9.0]);
    }

    #[test]
    fn sums_templates_before_subtracting() {
        let folded = hist("folded", &[10.0, 10.0]);
        let a = hist("a", &[2.0, 0.0]);
        let b = hist("b", &[0.0, 4.0]);

        let result = subtract_backgrounds(&folded, &[a, b], 1.0, 1.0).unwrap();
        assert_eq!(result.cv(), &[8.0, 6.0]);
    }

    #[test]
    fn no_backgrounds_leaves_the_spectrum_unchanged() {
        let folded = hist("folded", &[3.0, 4.0]);
        let result = subtract_backgrounds(&folded, &[], 1.0e19, 2.0e19).unwrap();
        assert_eq!(result.cv(), folded.cv());
    }

    #[test]
    fn universes_subtract_lock_step() {
        let mut folded = hist("folded", &[10.0, 10.0]);
        folded
            .set_band(
                "X",
                ErrorBand::from_universes(&[vec![12.0, 12.0], vec![8.0, 8.0]]).unwrap(),
            )
            .unwrap();
        let mut bkg = hist("bkg", &[4.0, 4.0]);
        bkg.set_band(
            "X",
            ErrorBand::from_universes(&[vec![6.0, 6.0], vec![2.0, 2.0]]).unwrap(),
        )
        .unwrap();

        let result = subtract_backgrounds(&folded, &[bkg], 1.0, 2.0).unwrap();
        let band = result.band("X").unwrap();
        assert_eq!(band.universe(0), &[9.0, 9.0]);
        assert_eq!(band.universe(1), &[7.0, 7.0]);
    }

    #[test]
    fn unsynchronized_backgrounds_are_fatal() {
        let folded = hist("folded", &[10.0, 10.0]);
        let mut bkg = hist("bkg", &[1.0, 1.0]);
        bkg.set_band("OnlyInBackground", ErrorBand::filled(&[1.0, 1.0], 2)).unwrap();

        assert!(subtract_backgrounds(&folded, &[bkg], 1.0, 1.0).is_err());
    }
}

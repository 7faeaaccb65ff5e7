//! Estimativas de raiz para a inversão da integral.
//!
//! Queremos todo `x` real com F(x) = K, onde F(x) = c/(k+1)·x^(k+1) + b·x e
//! k = pow/frac. Com u = x^(1/frac) e n = pow + frac:
//!
//!   P(u) = A·u^n + b·u^frac - K,   A = c·frac/n
//!
//! P é polinomial em u, com derivada u^(frac-1)·(n·A·u^pow + frac·b): no
//! máximo três pontos críticos (0 e ±r). Entre pontos críticos P é monótono,
//! então cada intervalo tem no máximo uma raiz e a bisseção encontra todas.
//! Quem escolhe a raiz "certa" é o avaliador externo.

use super::curve::PrimitiveCurveConfig;
use super::errors::{BondingErrorCode, Result};
use crate::bonding_bail;

const BISECT_MAX_ITERS: usize = 200;
const DEDUP_REL: f64 = 1e-12;
const RESIDUAL_REL: f64 = 1e-8;

/// Todas as raízes reais de F(x) = `target`, em ordem crescente.
pub fn root_estimates(curve: &PrimitiveCurveConfig, target: f64) -> Result<Vec<f64>> {
    if !target.is_finite() {
        bonding_bail!(
            BondingErrorCode::ArithmeticDomainError,
            reason => format!("alvo da integral não é finito ({target})")
        );
    }
    let PrimitiveCurveConfig::Exponential { c, b, pow, frac } = *curve;

    let mut roots = if c == 0.0 || pow == 0 {
        // preço constante: F(x) = (c·[pow==0] + b)·x
        let slope = if c == 0.0 { b } else { c + b };
        if slope == 0.0 {
            Vec::new()
        } else {
            vec![target / slope]
        }
    } else {
        let n = u32::from(pow) + u32::from(frac);
        let a = c * f64::from(frac) / f64::from(n);
        let poly = Poly { a, n, b, f: u32::from(frac), k: target };
        let us = if b == 0.0 {
            real_nth_roots(target / a, n)
        } else {
            poly.real_roots()
        };
        us.into_iter()
            // frac par: x^(1/frac) só existe para u >= 0
            .filter(|u| frac % 2 == 1 || *u >= 0.0)
            .filter(|u| poly.is_root(*u))
            .map(|u| u.powi(i32::from(frac)))
            .collect()
    };

    roots.retain(|x| x.is_finite());
    roots.sort_by(|x, y| x.total_cmp(y));
    roots.dedup_by(|x, y| (*x - *y).abs() <= DEDUP_REL * x.abs().max(y.abs()).max(1.0));

    if roots.is_empty() {
        bonding_bail!(
            BondingErrorCode::ArithmeticDomainError,
            reason => format!("sem raiz real para F(x) = {target} (pow={pow}, frac={frac})")
        );
    }
    Ok(roots)
}

/// Menor raiz `>= floor` (com folga relativa), usada para compras.
pub fn first_root_at_or_above(roots: &[f64], floor: f64) -> Option<f64> {
    let slack = DEDUP_REL * floor.abs().max(1.0) * 1e3;
    roots.iter().copied().find(|r| *r >= floor - slack)
}

/// Maior raiz `<= ceiling`, usada para vendas.
pub fn last_root_at_or_below(roots: &[f64], ceiling: f64) -> Option<f64> {
    let slack = DEDUP_REL * ceiling.abs().max(1.0) * 1e3;
    roots.iter().rev().copied().find(|r| *r <= ceiling + slack)
}

/// Raízes reais de u^n = q.
fn real_nth_roots(q: f64, n: u32) -> Vec<f64> {
    if q == 0.0 {
        return vec![0.0];
    }
    let magnitude = q.abs().powf(1.0 / f64::from(n));
    if n % 2 == 1 {
        vec![magnitude.copysign(q)]
    } else if q > 0.0 {
        vec![-magnitude, magnitude]
    } else {
        Vec::new()
    }
}

/// P(u) = a·u^n + b·u^f - k
struct Poly {
    a: f64,
    n: u32,
    b: f64,
    f: u32,
    k: f64,
}

impl Poly {
    fn eval(&self, u: f64) -> f64 {
        self.a * u.powi(self.n as i32) + self.b * u.powi(self.f as i32) - self.k
    }

    /// Resíduo pequeno frente à escala dos termos.
    fn is_root(&self, u: f64) -> bool {
        let curve_term = self.a * u.powi(self.n as i32);
        let linear_term = self.b * u.powi(self.f as i32);
        let scale = curve_term.abs().max(linear_term.abs()).max(self.k.abs()).max(1.0);
        (curve_term + linear_term - self.k).abs() <= RESIDUAL_REL * scale
    }

    /// Pontos críticos: u = 0 (se f > 1) e u^(n-f) = -f·b/(n·a).
    fn critical_points(&self) -> Vec<f64> {
        let mut points = Vec::with_capacity(3);
        if self.f > 1 {
            points.push(0.0);
        }
        let q = -(f64::from(self.f) * self.b) / (f64::from(self.n) * self.a);
        points.extend(real_nth_roots(q, self.n - self.f));
        points.retain(|p| p.is_finite());
        points.sort_by(|x, y| x.total_cmp(y));
        points.dedup();
        points
    }

    /// Cota de Cauchy para |u| de qualquer raiz.
    fn cauchy_bound(&self) -> f64 {
        1.0 + self.b.abs().max(self.k.abs()) / self.a.abs()
    }

    fn real_roots(&self) -> Vec<f64> {
        let bound = self.cauchy_bound();
        let mut edges = vec![-bound];
        edges.extend(self.critical_points().into_iter().filter(|p| p.abs() < bound));
        edges.push(bound);

        let mut roots = Vec::new();
        for w in edges.windows(2) {
            let (lo, hi) = (w[0], w[1]);
            let (plo, phi) = (self.eval(lo), self.eval(hi));
            if plo == 0.0 {
                roots.push(lo);
            }
            if phi == 0.0 {
                roots.push(hi);
            }
            if plo.signum() * phi.signum() < 0.0 {
                roots.push(self.bisect(lo, hi, plo));
            }
        }
        roots
    }

    fn bisect(&self, mut lo: f64, mut hi: f64, mut plo: f64) -> f64 {
        for _ in 0..BISECT_MAX_ITERS {
            let mid = lo + (hi - lo) / 2.0;
            if mid <= lo || mid >= hi {
                break;
            }
            let pmid = self.eval(mid);
            if pmid == 0.0 {
                return mid;
            }
            if pmid.signum() == plo.signum() {
                lo = mid;
                plo = pmid;
            } else {
                hi = mid;
            }
        }
        lo + (hi - lo) / 2.0
    }
}

// -------------------------
// TESTES
// -------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn t_linear_price_square_roots() {
        // c=1,b=0,k=1: F(x) = x²/2 ; F(x)=50 → x=±10
        let curve = PrimitiveCurveConfig::exponential(1.0, 0.0, 1, 1).unwrap();
        let roots = root_estimates(&curve, 50.0).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(close(roots[0], -10.0));
        assert!(close(roots[1], 10.0));
        assert!(roots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn t_constant_price_single_root() {
        let curve = PrimitiveCurveConfig::exponential(0.0, 2.0, 1, 1).unwrap();
        let roots = root_estimates(&curve, 10.0).unwrap();
        assert_eq!(roots, vec![5.0]);
    }

    #[test]
    fn t_zero_curve_has_no_root() {
        let curve = PrimitiveCurveConfig::exponential(0.0, 0.0, 1, 1).unwrap();
        let err = root_estimates(&curve, 10.0).unwrap_err();
        assert!(err.is(BondingErrorCode::ArithmeticDomainError));
    }

    #[test]
    fn t_even_degree_negative_target_has_no_root() {
        let curve = PrimitiveCurveConfig::exponential(1.0, 0.0, 1, 1).unwrap();
        assert!(root_estimates(&curve, -1.0).is_err());
    }

    #[test]
    fn t_fractional_exponent_even_frac_dedups() {
        // k = 1/2, frac=2 → x = u², ±u colapsam
        let curve = PrimitiveCurveConfig::exponential(3.0, 0.0, 1, 2).unwrap();
        let x = 16.0;
        let target = curve.antiderivative(x);
        let roots = root_estimates(&curve, target).unwrap();
        assert!(roots.iter().any(|r| close(*r, x)), "{roots:?}");
        assert!(roots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn t_mixed_terms_numeric_roots() {
        // c>0, b<0: preço negativo perto de 0, P não monótono
        let curve = PrimitiveCurveConfig::exponential(2.0, -3.0, 1, 1).unwrap();
        let x = 7.5;
        let target = curve.antiderivative(x);
        let roots = root_estimates(&curve, target).unwrap();
        assert!(roots.iter().any(|r| close(*r, x)), "{roots:?}");
        for r in &roots {
            // toda raiz devolvida satisfaz F(r) ≈ alvo
            let val = 2.0 / 2.0 * r * r - 3.0 * r;
            assert!(close(val, target), "r={r} val={val}");
        }
    }

    /// F com raiz assinada de x; vale também para x < 0 com frac ímpar.
    fn signed_antiderivative(c: f64, b: f64, pow: u8, frac: u8, x: f64) -> f64 {
        let u = x.abs().powf(1.0 / f64::from(frac)).copysign(x);
        let n = i32::from(pow) + i32::from(frac);
        c * f64::from(frac) / f64::from(n) * u.powi(n) + b * u.powi(i32::from(frac))
    }

    fn assert_all_roots(c: f64, b: f64, pow: u8, frac: u8, target: f64) -> Vec<f64> {
        let curve = PrimitiveCurveConfig::exponential(c, b, pow, frac).unwrap();
        let roots = root_estimates(&curve, target).unwrap();
        for r in &roots {
            let val = signed_antiderivative(c, b, pow, frac, *r);
            assert!(
                (val - target).abs() <= 1e-7 * target.abs().max(1.0),
                "({c},{b},{pow},{frac}) r={r} F(r)={val} alvo={target} raízes={roots:?}"
            );
        }
        roots
    }

    #[test]
    fn t_even_frac_mixed_terms_only_true_roots() {
        // preço = -√S + 10: sobe F até S=100 e depois desce
        let curve = PrimitiveCurveConfig::exponential(-1.0, 10.0, 1, 2).unwrap();
        let target = curve.antiderivative(4.0) + 5.0;
        let roots = assert_all_roots(-1.0, 10.0, 1, 2, target);
        assert_eq!(roots.len(), 2, "{roots:?}");
        assert!(roots.iter().all(|r| *r >= 0.0));
        // venda a partir de S0 acima da raiz menor não pode cair numa raiz falsa
        let below = last_root_at_or_below(&roots, 4.7).unwrap();
        assert!(close(curve.antiderivative(below), target), "{below}");
    }

    #[test]
    fn t_even_frac_negative_target() {
        // preço = √S - 1: F mínimo -1/3 em S=1, alvo -0.2 tem duas raízes positivas
        let roots = assert_all_roots(1.0, -1.0, 1, 2, -0.2);
        assert_eq!(roots.len(), 2, "{roots:?}");
        assert!(roots[0] < 1.0 && roots[1] > 1.0);
    }

    #[test]
    fn t_odd_frac_keeps_negative_roots() {
        // frac=3: u < 0 dá x < 0 legítimo
        let roots = assert_all_roots(1.0, -2.0, 2, 3, 1.5);
        assert!(!roots.is_empty());
        for (c, b, pow, frac, k) in [(2.0, -3.0, 1, 1, 4.0), (0.5, -1.0, 3, 2, 7.0), (3.0, -0.5, 2, 4, 0.01)] {
            assert_all_roots(c, b, pow, frac, k);
        }
    }

    #[test]
    fn t_selection_helpers() {
        let roots = [-10.0, 2.0, 10.0];
        assert_eq!(first_root_at_or_above(&roots, 3.0), Some(10.0));
        assert_eq!(last_root_at_or_below(&roots, 3.0), Some(2.0));
        assert_eq!(first_root_at_or_above(&roots, 11.0), None);
    }
}

//! Comparison-test layouts: the test summary and, for Hausman, the per-term
//! audit table.

use sa_core::ComparisonResult;

use crate::table::{RenderedTable, fmt_num, fmt_opt};

fn pair(label: &str, value: String) -> Vec<String> {
    vec![label.to_string(), value]
}

/// Summary table, followed by the audit table when the result carries one.
pub fn comparison_tables(r: &ComparisonResult, decimals: u32) -> Vec<RenderedTable> {
    let mut summary = RenderedTable::new(r.test_name.clone(), vec!["".to_string(), "Value".to_string()]);
    summary.rows.push(pair("H0", r.null_hypothesis.clone()));
    summary.rows.push(pair("H1", r.alternative_hypothesis.clone()));
    summary.rows.push(pair("Statistic", format!("{}{}", fmt_num(r.statistic, decimals), r.significance)));
    summary.rows.push(pair(
        "Degrees of freedom",
        match r.df2 {
            Some(df2) => format!("({}, {})", r.df1, df2),
            None => r.df1.to_string(),
        },
    ));
    summary.rows.push(pair("p-value", fmt_num(r.p_value, decimals)));
    if let Some(rss) = r.rss_pooled {
        summary.rows.push(pair("RSS (pooled)", fmt_num(rss, decimals)));
    }
    if let Some(rss) = r.rss_fe {
        summary.rows.push(pair("RSS (FE)", fmt_num(rss, decimals)));
    }
    if let Some(s) = r.audit.as_ref().and_then(|a| a.scaling) {
        summary.rows.push(pair("sigmamore scaling", fmt_num(s, decimals)));
    }
    summary.footer.push(pair("Entities", r.n_entities.to_string()));
    summary.footer.push(pair("Observations", r.n_obs.to_string()));
    summary.notes.push(format!("Conclusion: {}", r.conclusion));
    summary.notes.push(sa_core::Significance::LEGEND.to_string());

    let mut out = vec![summary];
    if let Some(a) = &r.audit {
        let header = ["Variable", "FE", "RE", "Difference", "S.E. (FE)", "S.E. (RE)", "S.E. (diff)"]
            .map(String::from)
            .to_vec();
        let mut audit = RenderedTable::new(format!("{}: coefficients", r.test_name), header);
        for (i, name) in a.variables.iter().enumerate() {
            audit.rows.push(vec![
                name.clone(),
                fmt_num(a.fe_coef[i], decimals),
                fmt_num(a.re_coef[i], decimals),
                fmt_num(a.coef_diff[i], decimals),
                fmt_num(a.fe_std_err[i], decimals),
                fmt_num(a.re_std_err[i], decimals),
                fmt_opt(a.std_err_diff[i], decimals),
            ]);
        }
        out.push(audit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{ComparisonTest, HausmanAudit, Significance};

    fn result(test: ComparisonTest) -> ComparisonResult {
        ComparisonResult {
            test,
            test_name: test.title().into(),
            null_hypothesis: "h0".into(),
            alternative_hypothesis: "h1".into(),
            statistic: 12.3456,
            df1: 2,
            df2: None,
            p_value: 0.0021,
            significance: Significance::from_p(0.0021),
            conclusion: "reject random effects in favor of fixed effects".into(),
            rss_pooled: None,
            rss_fe: None,
            n_entities: 10,
            n_obs: 50,
            audit: None,
        }
    }

    #[test]
    fn test_f_test_summary() {
        let mut r = result(ComparisonTest::FTest);
        r.df2 = Some(39);
        r.rss_pooled = Some(120.0);
        r.rss_fe = Some(80.0);
        let out = comparison_tables(&r, 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].row("Statistic").unwrap()[1], "12.346***");
        assert_eq!(out[0].row("Degrees of freedom").unwrap()[1], "(2, 39)");
        assert_eq!(out[0].row("RSS (FE)").unwrap()[1], "80.000");
    }

    #[test]
    fn test_hausman_audit_table() {
        let mut r = result(ComparisonTest::HausmanSigmaMore);
        r.audit = Some(HausmanAudit {
            variables: vec!["x".into(), "Constant".into()],
            fe_coef: vec![1.0, 2.0],
            re_coef: vec![0.5, 2.5],
            coef_diff: vec![0.5, -0.5],
            fe_std_err: vec![0.2, 0.3],
            re_std_err: vec![0.1, 0.4],
            std_err_diff: vec![Some(0.17), None],
            scaling: Some(1.25),
        });
        let out = comparison_tables(&r, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].row("sigmamore scaling").unwrap()[1], "1.25");
        assert_eq!(out[1].rows[1], vec!["Constant", "2.00", "2.50", "-0.50", "0.30", "0.40", "-"]);
    }
}
